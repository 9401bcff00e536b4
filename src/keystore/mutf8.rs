//! Java "modified UTF-8" as written by `DataOutput.writeUTF`.
//!
//! Strings are encoded per UTF-16 code unit: NUL takes two bytes and
//! supplementary characters are written as a surrogate pair of three-byte
//! sequences.

pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Returns `None` for malformed sequences or unpaired surrogates.
pub fn decode(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        let unit = if b0 & 0x80 == 0 {
            i += 1;
            b0
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes.get(i + 1))?;
            i += 2;
            ((b0 & 0x1F) << 6) | b1
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes.get(i + 1))?;
            let b2 = continuation(bytes.get(i + 2))?;
            i += 3;
            ((b0 & 0x0F) << 12) | (b1 << 6) | b2
        } else {
            return None;
        };
        units.push(unit);
    }
    String::from_utf16(&units).ok()
}

fn continuation(b: Option<&u8>) -> Option<u16> {
    match b {
        Some(&b) if b & 0xC0 == 0x80 => Some((b & 0x3F) as u16),
        _ => None,
    }
}
