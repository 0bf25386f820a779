//! Enum option resolution
//!
//! Enum fields store an index into a list of names. Lists may contain the
//! same name more than once, so rendered names carry a `~k` suffix naming
//! which occurrence they are, and matching honours that suffix.

use crate::model::{AnchorResolver, DataModel, OptionProvider, RunRegistry};

/// Options for an enum table.
///
/// A decimal table name `N` means the options `"0"` through `"N-1"`. A table
/// with no declared names falls back to the element indices of the table
/// anchored at that name, so selection tooling always has something to show.
pub fn options_for_enum<M: DataModel + ?Sized>(model: &M, table: &str) -> Vec<String> {
    if let Ok(count) = table.parse::<usize>() {
        return numbered(count);
    }
    let options = model.options_for(table);
    if !options.is_empty() {
        return options;
    }
    let Some(address) = model.address_for_name(table) else {
        return Vec::new();
    };
    model
        .run_at_or_after(address)
        .filter(|run| run.start == address)
        .and_then(|run| run.as_table())
        .map(|table| numbered(table.element_count))
        .unwrap_or_default()
}

fn numbered(count: usize) -> Vec<String> {
    (0..count).map(|i| i.to_string()).collect()
}

/// Render the option at `index`, or `None` if the index is out of range.
///
/// Surrounding quotes are stripped, repeated names get a `~k` suffix, and
/// names containing spaces are re-quoted.
pub fn decode(options: &[String], index: i64) -> Option<String> {
    let index = usize::try_from(index).ok()?;
    let raw = options.get(index)?;

    let occurrence = 1 + options[..index].iter().filter(|option| *option == raw).count();
    let mut value = dequote(raw).to_string();
    if occurrence > 1 {
        value.push_str(&format!("~{occurrence}"));
    }
    if value.contains(' ') {
        value = format!("\"{value}\"");
    }
    Some(value)
}

/// Match text against an option list, returning the option index.
///
/// Plain numbers are accepted as-is. A `~k` suffix selects the k-th
/// occurrence (default 1). Exact case-insensitive matches always win over
/// partial matches; partial matches are only considered when the text
/// matches no option exactly.
pub fn try_match(text: &str, options: &[String]) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    let text = dequote(text);

    let (text, desired) = match text.split_once('~') {
        Some((name, occurrence)) => (name, occurrence.trim().parse::<usize>().ok()?),
        None => (text, 1),
    };
    if desired == 0 {
        return None;
    }
    let text = text.to_lowercase();

    let candidates: Vec<String> = options
        .iter()
        .map(|option| {
            let option = option.to_lowercase();
            let option = option.split('~').next().unwrap_or_default();
            dequote(option).to_string()
        })
        .collect();

    let exact: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, option)| **option == text)
        .map(|(index, _)| index)
        .collect();
    if let Some(index) = exact.get(desired - 1) {
        return Some(*index as i64);
    }
    if !exact.is_empty() {
        return None;
    }

    candidates
        .iter()
        .enumerate()
        .filter(|(_, option)| matches_partial(option, &text))
        .nth(desired - 1)
        .map(|(index, _)| index as i64)
}

/// Every character of `partial` appears in `full`, in order.
pub fn matches_partial(full: &str, partial: &str) -> bool {
    let mut remaining = full.chars();
    partial
        .chars()
        .all(|wanted| remaining.by_ref().any(|ch| ch.to_lowercase().eq(wanted.to_lowercase())))
}

fn dequote(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_decode_duplicates() {
        let options = list(&["Fire", "Water", "Fire"]);
        assert_eq!(decode(&options, 0).as_deref(), Some("Fire"));
        assert_eq!(decode(&options, 2).as_deref(), Some("Fire~2"));
        assert_eq!(decode(&options, 3), None);
        assert_eq!(decode(&options, -1), None);
    }

    #[test]
    fn test_decode_quotes() {
        let options = list(&["\"Mr. Mime\"", "Mr. Mime", "\"Plain\""]);
        assert_eq!(decode(&options, 0).as_deref(), Some("\"Mr. Mime\""));
        assert_eq!(decode(&options, 1).as_deref(), Some("\"Mr. Mime\""));
        assert_eq!(decode(&options, 2).as_deref(), Some("Plain"));
    }

    #[test]
    fn test_match_duplicates() {
        let options = list(&["Fire", "Water", "Fire"]);
        assert_eq!(try_match("Fire~2", &options), Some(2));
        assert_eq!(try_match("fire", &options), Some(0));
        assert_eq!(try_match("Fire~3", &options), None);
        assert_eq!(try_match("Fire~x", &options), None);
    }

    #[test]
    fn test_match_numbers_pass_through() {
        let options = list(&["Fire"]);
        assert_eq!(try_match(" 7 ", &options), Some(7));
    }

    #[test]
    fn test_exact_beats_partial() {
        let options = list(&["Thunder Punch", "Thunder"]);
        assert_eq!(try_match("thunder", &options), Some(1));
        assert_eq!(try_match("\"thunder punch\"", &options), Some(0));
    }

    #[test]
    fn test_partial_only_without_exact() {
        let options = list(&["Fire Fang", "Fire", "Fire Blast"]);
        // one exact match exists but not a second one
        assert_eq!(try_match("fire~2", &options), None);

        let options = list(&["Fire Fang", "Ice Fang", "Fire Blast"]);
        assert_eq!(try_match("fang", &options), Some(0));
        assert_eq!(try_match("fang~2", &options), Some(1));
        assert_eq!(try_match("frbl", &options), Some(2));
        assert_eq!(try_match("zap", &options), None);
    }

    #[test]
    fn test_options_for_numeric_table() {
        let model = MemoryModel::new(vec![0; 4]);
        assert_eq!(options_for_enum(&model, "3"), list(&["0", "1", "2"]));
    }

    #[test]
    fn test_options_fall_back_to_table_length() {
        let mut model = MemoryModel::new(vec![0; 16]);
        model.add_table("sizes", 4, "w. h.", 3).unwrap();
        assert_eq!(options_for_enum(&model, "sizes"), list(&["0", "1", "2"]));
        assert!(options_for_enum(&model, "missing").is_empty());
    }
}
