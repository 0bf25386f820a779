//! Character encoding for in-game text
//!
//! Text is stored one byte per character and terminated by `0xFF`. Bytes
//! without a printable character render as `\XX` escapes so that every
//! string survives a text round trip. `0xFE` is a line break, written `\n`.

use crate::model::ByteStore;

/// End of string
pub const TERMINATOR: u8 = 0xFF;

/// Line break
pub const NEWLINE: u8 = 0xFE;

/// Longest string searched for when guessing text at a pointer destination
pub const MAX_STRING_SEARCH: usize = 1000;

/// Characters outside the contiguous digit and letter ranges
const CHARACTERS: &[(u8, char)] = &[
    (0x00, ' '),
    (0x01, 'À'),
    (0x02, 'Á'),
    (0x03, 'Â'),
    (0x04, 'Ç'),
    (0x05, 'È'),
    (0x06, 'É'),
    (0x07, 'Ê'),
    (0x08, 'Ë'),
    (0x09, 'Ì'),
    (0x0B, 'Î'),
    (0x0C, 'Ï'),
    (0x0D, 'Ò'),
    (0x0E, 'Ó'),
    (0x0F, 'Ô'),
    (0x10, 'Œ'),
    (0x11, 'Ù'),
    (0x12, 'Ú'),
    (0x13, 'Û'),
    (0x14, 'Ñ'),
    (0x15, 'ß'),
    (0x16, 'à'),
    (0x17, 'á'),
    (0x19, 'ç'),
    (0x1A, 'è'),
    (0x1B, 'é'),
    (0x1C, 'ê'),
    (0x1D, 'ë'),
    (0x1E, 'ì'),
    (0x20, 'î'),
    (0x21, 'ï'),
    (0x22, 'ò'),
    (0x23, 'ó'),
    (0x24, 'ô'),
    (0x25, 'œ'),
    (0x26, 'ù'),
    (0x27, 'ú'),
    (0x28, 'û'),
    (0x29, 'ñ'),
    (0x2A, 'º'),
    (0x2B, 'ª'),
    (0x2D, '&'),
    (0x2E, '+'),
    (0x35, '='),
    (0x36, ';'),
    (0x51, '¿'),
    (0x52, '¡'),
    (0x5A, 'Í'),
    (0x5B, '%'),
    (0x5C, '('),
    (0x5D, ')'),
    (0x68, 'â'),
    (0x6F, 'í'),
    (0x85, '<'),
    (0x86, '>'),
    (0xAB, '!'),
    (0xAC, '?'),
    (0xAD, '.'),
    (0xAE, '-'),
    (0xAF, '·'),
    (0xB0, '…'),
    (0xB1, '“'),
    (0xB2, '”'),
    (0xB3, '‘'),
    (0xB4, '\''),
    (0xB5, '♂'),
    (0xB6, '♀'),
    (0xB7, '$'),
    (0xB8, ','),
    (0xB9, '×'),
    (0xBA, '/'),
    (0xEF, '▶'),
    (0xF0, ':'),
    (0xF1, 'Ä'),
    (0xF2, 'Ö'),
    (0xF3, 'Ü'),
    (0xF4, 'ä'),
    (0xF5, 'ö'),
    (0xF6, 'ü'),
];

/// Printable character for a byte
pub fn char_for(byte: u8) -> Option<char> {
    match byte {
        0xA1..=0xAA => Some((b'0' + (byte - 0xA1)) as char),
        0xBB..=0xD4 => Some((b'A' + (byte - 0xBB)) as char),
        0xD5..=0xEE => Some((b'a' + (byte - 0xD5)) as char),
        _ => CHARACTERS.iter().find(|(b, _)| *b == byte).map(|(_, c)| *c),
    }
}

/// Byte for a printable character
pub fn byte_for(ch: char) -> Option<u8> {
    match ch {
        '0'..='9' => Some(0xA1 + (ch as u8 - b'0')),
        'A'..='Z' => Some(0xBB + (ch as u8 - b'A')),
        'a'..='z' => Some(0xD5 + (ch as u8 - b'a')),
        _ => CHARACTERS.iter().find(|(_, c)| *c == ch).map(|(b, _)| *b),
    }
}

/// Render bytes up to the first terminator as quoted text.
pub fn decode(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() + 2);
    result.push('"');
    for &byte in bytes.iter().take_while(|&&byte| byte != TERMINATOR) {
        match (byte, char_for(byte)) {
            (NEWLINE, _) => result.push_str("\\n"),
            (_, Some(ch)) => result.push(ch),
            (_, None) => result.push_str(&format!("\\{byte:02X}")),
        }
    }
    result.push('"');
    result
}

/// Render the `length` bytes at `start` as quoted text.
pub fn read<M: ByteStore + ?Sized>(model: &M, start: usize, length: usize) -> String {
    let bytes: Vec<u8> = (start..start + length).map(|address| model.byte(address)).collect();
    decode(&bytes)
}

/// Convert text (optionally quoted) to bytes, terminator included.
///
/// Characters with no encoding are dropped.
pub fn encode(text: &str) -> Vec<u8> {
    let text = text.trim();
    let text = text.strip_prefix('"').unwrap_or(text);
    let text = text.strip_suffix('"').unwrap_or(text);

    let mut bytes = Vec::with_capacity(text.len() + 1);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            if let Some(byte) = byte_for(ch) {
                bytes.push(byte);
            }
            continue;
        }
        if chars.peek() == Some(&'n') {
            chars.next();
            bytes.push(NEWLINE);
            continue;
        }
        let escape: String = chars.clone().take(2).collect();
        if escape.len() == 2 {
            if let Ok(byte) = u8::from_str_radix(&escape, 16) {
                chars.next();
                chars.next();
                bytes.push(byte);
            }
        }
    }
    bytes.push(TERMINATOR);
    bytes
}

/// Length of the string at `start`, terminator included, if a terminator
/// appears within `max` bytes and before the end of the data.
pub fn string_length<M: ByteStore + ?Sized>(model: &M, start: usize, max: usize) -> Option<usize> {
    let end = model.len().min(start.saturating_add(max));
    (start..end)
        .position(|address| model.byte(address) == TERMINATOR)
        .map(|index| index + 1)
}
