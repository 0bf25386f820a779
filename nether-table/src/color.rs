//! BGR555 colour conversion
//!
//! Colours are packed into 16 bits: red in bits 0-4, green in 5-9, blue in
//! 10-14. Bit 15 is unused: text ignores it and writes preserve it. Text form is `red:green:blue` with
//! each channel in 0-31.

const CHANNEL_MASK: u16 = 0x1F;

/// Bit 15, not part of any channel. Writes keep whatever is stored there.
pub const UNUSED_BIT: u32 = 0x8000;

/// Render a packed colour as `r:g:b`
pub fn decode(color: u16) -> String {
    let red = color & CHANNEL_MASK;
    let green = (color >> 5) & CHANNEL_MASK;
    let blue = (color >> 10) & CHANNEL_MASK;
    format!("{red}:{green}:{blue}")
}

/// Pack `r:g:b` text. Channels above 31 are truncated to their low bits.
pub fn encode(text: &str) -> Option<u16> {
    let mut channels = text.trim().split(':').map(|part| part.trim().parse::<u16>());
    let (Some(Ok(red)), Some(Ok(green)), Some(Ok(blue)), None) =
        (channels.next(), channels.next(), channels.next(), channels.next())
    else {
        return None;
    };
    Some((red & CHANNEL_MASK) | (green & CHANNEL_MASK) << 5 | (blue & CHANNEL_MASK) << 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        assert_eq!(decode(0x7FFF), "31:31:31");
        assert_eq!(decode(0x001F), "31:0:0");
        assert_eq!(decode(0x7C00), "0:0:31");
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("31:0:0"), Some(0x001F));
        assert_eq!(encode(" 1 : 2 : 3 "), Some(1 | 2 << 5 | 3 << 10));
        assert_eq!(encode("1:2"), None);
        assert_eq!(encode("1:2:3:4"), None);
        assert_eq!(encode("red"), None);
    }
}
