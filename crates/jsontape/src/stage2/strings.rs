//! String token decoding.
//!
//! Strings are unescaped straight into the document's string arena as a
//! length-prefixed record: a little-endian `u32` byte length followed by the
//! UTF-8 bytes. Stage 1 already validated the input as UTF-8, so unescaped
//! bytes are copied through untouched; only escape sequences need decoding.

use crate::error::{Error, Result};

/// Decode the string token whose opening quote is at `start`, appending a
/// length-prefixed record to `arena`. Returns the record's offset.
///
/// `len` is the logical input length; bytes past it are padding and must not
/// be part of a well-formed token.
pub(crate) fn parse_string(
    src: &[u8],
    len: usize,
    start: usize,
    arena: &mut Vec<u8>,
) -> Result<u32> {
    let record = arena.len();
    arena.extend_from_slice(&[0; 4]);

    let mut i = start + 1;
    loop {
        if i >= len {
            return Err(Error::UnclosedString);
        }
        match src[i] {
            b'"' => break,
            b'\\' => i = decode_escape(src, len, i, arena)?,
            b if b < 0x20 => return Err(Error::UnescapedControl),
            b => {
                arena.push(b);
                i += 1;
            }
        }
    }

    let written = arena.len() - record - 4;
    let written = u32::try_from(written).map_err(|_| Error::Capacity)?;
    arena[record..record + 4].copy_from_slice(&written.to_le_bytes());
    u32::try_from(record).map_err(|_| Error::Capacity)
}

/// Decode one escape sequence starting at the backslash at `i`; returns the
/// index of the first byte after the sequence.
fn decode_escape(src: &[u8], len: usize, i: usize, arena: &mut Vec<u8>) -> Result<usize> {
    if i + 1 >= len {
        return Err(Error::UnclosedString);
    }
    let decoded = match src[i + 1] {
        b'"' => b'"',
        b'\\' => b'\\',
        b'/' => b'/',
        b'b' => 0x08,
        b'f' => 0x0C,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'u' => return decode_unicode_escape(src, len, i, arena),
        _ => return Err(Error::InvalidEscape),
    };
    arena.push(decoded);
    Ok(i + 2)
}

/// Decode a `\uXXXX` sequence at `i`, combining surrogate pairs, and append
/// the code point as UTF-8.
fn decode_unicode_escape(src: &[u8], len: usize, i: usize, arena: &mut Vec<u8>) -> Result<usize> {
    let first = parse_hex4(src, len, i + 2)?;
    let (code, next) = if (0xD800..0xDC00).contains(&first) {
        // High surrogate: a low surrogate escape must follow immediately.
        if i + 7 >= len || src[i + 6] != b'\\' || src[i + 7] != b'u' {
            return Err(Error::InvalidUnicodeEscape);
        }
        let second = parse_hex4(src, len, i + 8)?;
        if !(0xDC00..0xE000).contains(&second) {
            return Err(Error::InvalidUnicodeEscape);
        }
        let combined = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
        (combined, i + 12)
    } else if (0xDC00..0xE000).contains(&first) {
        // Lone low surrogate.
        return Err(Error::InvalidUnicodeEscape);
    } else {
        (first, i + 6)
    };

    let ch = char::from_u32(code).ok_or(Error::InvalidUnicodeEscape)?;
    let mut buf = [0u8; 4];
    arena.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    Ok(next)
}

fn parse_hex4(src: &[u8], len: usize, at: usize) -> Result<u32> {
    if at + 4 > len {
        return Err(Error::UnclosedString);
    }
    let mut value = 0u32;
    for &b in &src[at..at + 4] {
        let digit = match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'a'..=b'f' => u32::from(b - b'a') + 10,
            b'A'..=b'F' => u32::from(b - b'A') + 10,
            _ => return Err(Error::InvalidUnicodeEscape),
        };
        value = value << 4 | digit;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::parse_string;
    use crate::error::Error;

    fn unescape(token: &str) -> Result<String, Error> {
        let bytes = token.as_bytes();
        let mut arena = Vec::new();
        let offset = parse_string(bytes, bytes.len(), 0, &mut arena)? as usize;
        let len = u32::from_le_bytes(arena[offset..offset + 4].try_into().unwrap()) as usize;
        Ok(String::from_utf8(arena[offset + 4..offset + 4 + len].to_vec()).unwrap())
    }

    #[test]
    fn plain_and_simple_escapes() {
        assert_eq!(unescape(r#""hello""#).unwrap(), "hello");
        assert_eq!(unescape(r#""a\"b\\c\/d""#).unwrap(), "a\"b\\c/d");
        assert_eq!(unescape(r#""\b\f\n\r\t""#).unwrap(), "\u{8}\u{c}\n\r\t");
        assert_eq!(unescape(r#""""#).unwrap(), "");
    }

    #[test]
    fn unicode_escapes() {
        assert_eq!(unescape(r#""\u0041""#).unwrap(), "A");
        assert_eq!(unescape(r#""\u00e9""#).unwrap(), "é");
        assert_eq!(unescape(r#""\u2603""#).unwrap(), "☃");
        // surrogate pair for U+1F600
        assert_eq!(unescape(r#""\uD83D\uDE00""#).unwrap(), "😀");
    }

    #[test]
    fn multiple_records_share_one_arena() {
        let mut arena = Vec::new();
        let a = parse_string(br#""one""#, 5, 0, &mut arena).unwrap();
        let b = parse_string(br#""two""#, 5, 0, &mut arena).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 4 + 3);
        assert_eq!(&arena[4..7], b"one");
        assert_eq!(&arena[11..14], b"two");
    }

    #[test]
    fn rejects_bad_escapes() {
        assert_eq!(unescape(r#""\x""#), Err(Error::InvalidEscape));
        assert_eq!(unescape(r#""\u12G4""#), Err(Error::InvalidUnicodeEscape));
        assert_eq!(unescape(r#""\uD800""#), Err(Error::InvalidUnicodeEscape));
        assert_eq!(unescape(r#""\uD800\u0041""#), Err(Error::InvalidUnicodeEscape));
        assert_eq!(unescape(r#""\uDC00""#), Err(Error::InvalidUnicodeEscape));
    }

    #[test]
    fn rejects_raw_control_bytes() {
        assert_eq!(unescape("\"a\u{1}b\""), Err(Error::UnescapedControl));
        assert_eq!(unescape("\"a\tb\""), Err(Error::UnescapedControl));
    }

    #[test]
    fn truncated_token_is_unclosed() {
        assert_eq!(unescape(r#""abc"#), Err(Error::UnclosedString));
        assert_eq!(unescape(r#""ab\"#), Err(Error::UnclosedString));
        assert_eq!(unescape(r#""\u00"#), Err(Error::UnclosedString));
    }
}
