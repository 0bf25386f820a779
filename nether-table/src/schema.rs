//! Schema text parsing
//!
//! A schema is a whitespace separated list of field tokens:
//!
//! | Token | Field |
//! |---|---|
//! | `name""N` | text, N bytes |
//! | `name<>` / `name<inner>` | pointer, optionally formatted at its destination |
//! | `name.` `name:` `name:.` `name::` | integer, 1/2/3/4 bytes |
//! | integer token + `|h` | hex integer |
//! | `name:|c` | BGR555 colour |
//! | integer token + `table` / `table+N` | enum, with optional value offset |
//! | integer token + `|s=field(v=table|...)` | record (discriminated) field |
//! | `name#N source` | bit array, N bytes, flag names from `source` |
//!
//! Parsing is purely syntactic. Whether enum tables or flag sources exist is
//! only checked when a record is rendered.

use std::sync::Arc;

use crate::error::{Result, TableError};
use crate::segment::{Segment, SegmentList};
use crate::{BIT_ARRAY_MARKER, COLOR_FORMAT, HEX_FORMAT, RECORD_FORMAT, TEXT_MARKER};

/// Characters that end a field name
const TYPE_MARKERS: [char; 6] = ['.', ':', '"', '<', '#', '|'];

/// Integer length markers, longest first
const INTEGER_MARKERS: [(&str, usize); 4] = [("::", 4), (":.", 3), (":", 2), (".", 1)];

/// Parse a schema into its ordered field list.
///
/// # Example
/// ```
/// let segments = nether_table::schema::parse("name\"\"11 hp. type.types").unwrap();
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[0].length, 11);
/// ```
pub fn parse(format: &str) -> Result<Vec<Segment>> {
    let mut tokens = tokenize(format)?.into_iter();
    let mut segments = Vec::new();
    while let Some(token) = tokens.next() {
        let segment = parse_segment(token, &mut tokens)?;
        if segments.iter().any(|existing: &Segment| existing.name == segment.name) {
            return Err(TableError::syntax(token, "duplicate field name"));
        }
        segments.push(segment);
    }
    Ok(segments)
}

/// Split on whitespace, keeping `<...>` and `(...)` groups whole.
fn tokenize(format: &str) -> Result<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut depth = 0i32;
    let mut start = None;

    for (index, ch) in format.char_indices() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(TableError::syntax(format, format!("unbalanced `{ch}`")));
        }
        if ch.is_whitespace() && depth == 0 {
            if let Some(token_start) = start.take() {
                tokens.push(&format[token_start..index]);
            }
        } else if start.is_none() {
            start = Some(index);
        }
    }

    if depth != 0 {
        return Err(TableError::syntax(format, "unclosed bracket"));
    }
    if let Some(token_start) = start {
        tokens.push(&format[token_start..]);
    }
    Ok(tokens)
}

fn parse_segment<'a>(token: &'a str, rest: &mut impl Iterator<Item = &'a str>) -> Result<Segment> {
    let Some(split) = token.find(TYPE_MARKERS) else {
        return Err(TableError::syntax(token, "missing field type"));
    };
    let (name, format) = token.split_at(split);
    if name.is_empty() {
        return Err(TableError::syntax(token, "missing field name"));
    }

    if let Some(length) = format.strip_prefix(TEXT_MARKER) {
        return match length.parse::<usize>() {
            Ok(length) if length > 0 => Ok(Segment::text(name, length)),
            _ => Err(TableError::syntax(token, "text length must be a positive number")),
        };
    }

    if let Some(inner) = format.strip_prefix('<') {
        let Some(inner) = inner.strip_suffix('>') else {
            return Err(TableError::syntax(token, "pointer format must end with `>`"));
        };
        return Ok(Segment::pointer(name, inner));
    }

    if let Some(length) = format.strip_prefix(BIT_ARRAY_MARKER) {
        let Ok(length) = length.parse::<usize>() else {
            return Err(TableError::syntax(token, "bit array length must be a number"));
        };
        if length == 0 {
            return Err(TableError::syntax(token, "bit array length must be positive"));
        }
        let Some(source) = rest.next() else {
            return Err(TableError::syntax(token, "bit array is missing its source list"));
        };
        return Ok(Segment::bit_array(name, length, source));
    }

    let Some((length, suffix)) = INTEGER_MARKERS
        .iter()
        .find_map(|(marker, length)| format.strip_prefix(marker).map(|suffix| (*length, suffix)))
    else {
        return Err(TableError::syntax(token, "unknown field type"));
    };

    match suffix {
        "" => Ok(Segment::integer(name, length)),
        HEX_FORMAT => Ok(Segment::hex(name, length)),
        COLOR_FORMAT if length == 2 => Ok(Segment::color(name)),
        COLOR_FORMAT => Err(TableError::syntax(token, "colors are always 2 bytes")),
        _ if suffix.starts_with(RECORD_FORMAT) => Segment::record(name, length, suffix),
        _ if suffix.starts_with('|') => Err(TableError::syntax(token, "unknown integer format")),
        table => Ok(Segment::enumeration(name, length, table)),
    }
}

/// How many elements a nested table has
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLength {
    /// Fixed element count
    Fixed(usize),
    /// Count read from a sibling field of the record holding the pointer
    Sibling(String),
    /// Elements continue until one made entirely of 0xFF bytes
    Terminated,
}

/// Format expected at a pointer's destination
#[derive(Debug, Clone, PartialEq)]
pub enum InnerFormat {
    /// `""`: 0xFF-terminated text
    Text,
    /// `[fields]N`, `[fields]sibling` or `[fields]`
    Table {
        segments: SegmentList,
        length: TableLength,
    },
}

/// Parse a pointer's inner format. An empty format means a plain pointer.
pub fn parse_inner_format(inner: &str) -> Result<Option<InnerFormat>> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Ok(None);
    }
    if inner == TEXT_MARKER {
        return Ok(Some(InnerFormat::Text));
    }

    let unknown = || TableError::UnknownInnerFormat(inner.to_string());
    let body = inner.strip_prefix('[').ok_or_else(unknown)?;
    let close = body.rfind(']').ok_or_else(unknown)?;
    let (fields, length) = (&body[..close], &body[close + 1..]);

    let segments = parse(fields)?;
    if segments.is_empty() {
        return Err(TableError::syntax(inner, "nested table has no fields"));
    }
    let length = if length.is_empty() {
        TableLength::Terminated
    } else if let Ok(count) = length.parse::<usize>() {
        TableLength::Fixed(count)
    } else {
        TableLength::Sibling(length.to_string())
    };

    Ok(Some(InnerFormat::Table {
        segments: Arc::from(segments),
        length,
    }))
}
