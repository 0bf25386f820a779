//! Bit-flag rendering
//!
//! A bit array stores one flag per bit, least significant bit first: bit
//! `byte * 8 + position` is named by entry of the same index in the source
//! list. The rendered form is `- name name /`.
//!
//! Writing does not parse names back. Input is read as literal hex byte
//! pairs (`0501` sets bytes `05 01`), so the rendered form does not round
//! trip through a write.

/// Opens the flag list
pub const FLAGS_START: &str = "-";

/// Closes the flag list
pub const FLAGS_END: &str = "/";

/// Render the set bits of `bytes` as names from `options`.
///
/// Bits beyond the end of the option list render as their bit index.
pub fn render(bytes: &[u8], options: &[String]) -> String {
    let mut result = String::from(FLAGS_START);
    for (byte_index, bits) in bytes.iter().enumerate() {
        for position in 0..8 {
            if bits & (1 << position) == 0 {
                continue;
            }
            let index = (byte_index << 3) + position;
            result.push(' ');
            match options.get(index) {
                Some(name) => result.push_str(name),
                None => result.push_str(&index.to_string()),
            }
        }
    }
    result.push(' ');
    result.push_str(FLAGS_END);
    result
}

/// Decode up to `length` hex byte pairs. Malformed pairs decode to zero;
/// a trailing odd digit is ignored.
pub fn parse_hex_pairs(text: &str, length: usize) -> Vec<u8> {
    if text.trim_start().starts_with(FLAGS_START) && text.trim_end().ends_with(FLAGS_END) {
        tracing::warn!("Bit array text `{}` is in flag-name form; it is written as hex pairs", text);
    }
    text.as_bytes()
        .chunks_exact(2)
        .take(length)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .unwrap_or(0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_render_set_bits() {
        let options = names(&["A", "B", "C", "D"]);
        assert_eq!(render(&[0b0000_0101], &options), "- A C /");
    }

    #[test]
    fn test_render_empty_set() {
        assert_eq!(render(&[0, 0], &names(&["A"])), "- /");
    }

    #[test]
    fn test_render_second_byte_and_missing_names() {
        let options = names(&["A", "B", "C", "D", "E", "F", "G", "H", "I"]);
        assert_eq!(render(&[0x00, 0x03], &options), "- I 9 /");
    }

    #[test]
    fn test_parse_hex_pairs() {
        assert_eq!(parse_hex_pairs("05A0", 2), vec![0x05, 0xA0]);
        assert_eq!(parse_hex_pairs("05A0FF", 2), vec![0x05, 0xA0]);
        assert_eq!(parse_hex_pairs("0zA", 2), vec![0x00]);
        assert_eq!(parse_hex_pairs("", 2), Vec::<u8>::new());
    }
}
