//! UTF-8 byte-level helpers.
//!
//! These operate on raw byte slices one code point at a time, independent of
//! `std::str` (which requires the whole slice to already be valid UTF-8).
//! `String` payloads need this because construction from arbitrary bytes
//! must survive malformed input by substituting U+FFFD, and `Array`-style
//! code-point indexing needs to walk a *known-valid* string one code point
//! at a time without re-validating it.

/// Sentinel returned by [`decode_next`] for a malformed sequence.
pub const INVALID_CODEPOINT: i64 = -1;

/// Highest valid Unicode scalar value.
const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Number of bytes a UTF-8 sequence starting with `b` is expected to occupy,
/// ignoring whether the rest of the sequence actually validates. Always in
/// `1..=4`; a stray continuation byte or an invalid 5/6-byte lead byte is
/// reported as length 1 so callers advance exactly one byte past it.
pub fn leading_byte_length(b: u8) -> usize {
    if b & 0x80 == 0 {
        1
    } else if b & 0xE0 == 0xC0 {
        2
    } else if b & 0xF0 == 0xE0 {
        3
    } else if b & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

/// Decode the code point starting at `bytes[0]`.
///
/// Returns `(codepoint, consumed)`. On success `codepoint` is the decoded
/// scalar value and `consumed` is the sequence length (1..=4). On a
/// malformed sequence `codepoint` is [`INVALID_CODEPOINT`] and `consumed` is
/// always 1, so callers that replace-and-resync (substituting U+FFFD) make
/// forward progress one byte at a time. Returns `(INVALID_CODEPOINT, 0)`
/// only when `bytes` is empty.
pub fn decode_next(bytes: &[u8]) -> (i64, usize) {
    let Some(&lead) = bytes.first() else {
        return (INVALID_CODEPOINT, 0);
    };

    let len = leading_byte_length(lead);
    if len == 1 {
        return if lead < 0x80 {
            (lead as i64, 1)
        } else {
            (INVALID_CODEPOINT, 1)
        };
    }
    if bytes.len() < len {
        return (INVALID_CODEPOINT, 1);
    }

    let mut cp: u32 = match len {
        2 => (lead & 0x1F) as u32,
        3 => (lead & 0x0F) as u32,
        4 => (lead & 0x07) as u32,
        _ => unreachable!("leading_byte_length only returns 1..=4"),
    };
    for &b in &bytes[1..len] {
        if b & 0xC0 != 0x80 {
            return (INVALID_CODEPOINT, 1);
        }
        cp = (cp << 6) | (b & 0x3F) as u32;
    }

    let min_for_len = match len {
        2 => 0x80,
        3 => 0x800,
        4 => 0x10000,
        _ => unreachable!(),
    };
    if cp < min_for_len || cp > MAX_CODEPOINT || (0xD800..=0xDFFF).contains(&cp) {
        return (INVALID_CODEPOINT, 1);
    }

    (cp as i64, len)
}

/// Encode `cp` as UTF-8 into `out`, returning the number of bytes written.
///
/// `cp` must be a valid scalar value (`0..=0x10FFFF`, not a surrogate);
/// callers that might hold an out-of-range value (e.g. `string_implode`)
/// are responsible for substituting U+FFFD before calling this.
pub fn encode(cp: u32, out: &mut [u8; 4]) -> usize {
    debug_assert!(cp <= MAX_CODEPOINT && !(0xD800..=0xDFFF).contains(&cp));
    match cp {
        0..=0x7F => {
            out[0] = cp as u8;
            1
        }
        0x80..=0x7FF => {
            out[0] = 0xC0 | (cp >> 6) as u8;
            out[1] = 0x80 | (cp & 0x3F) as u8;
            2
        }
        0x800..=0xFFFF => {
            out[0] = 0xE0 | (cp >> 12) as u8;
            out[1] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            out[2] = 0x80 | (cp & 0x3F) as u8;
            3
        }
        _ => {
            out[0] = 0xF0 | (cp >> 18) as u8;
            out[1] = 0x80 | ((cp >> 12) & 0x3F) as u8;
            out[2] = 0x80 | ((cp >> 6) & 0x3F) as u8;
            out[3] = 0x80 | (cp & 0x3F) as u8;
            4
        }
    }
}

/// Whether `bytes` is entirely well-formed UTF-8.
pub fn is_valid(bytes: &[u8]) -> bool {
    let mut rest = bytes;
    while !rest.is_empty() {
        let (cp, consumed) = decode_next(rest);
        if cp == INVALID_CODEPOINT {
            return false;
        }
        rest = &rest[consumed..];
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ascii() {
        assert_eq!(decode_next(b"A"), (0x41, 1));
    }

    #[test]
    fn decodes_multibyte() {
        // "é" = U+00E9 = 0xC3 0xA9
        assert_eq!(decode_next(&[0xC3, 0xA9]), (0xE9, 2));
        // "€" = U+20AC = 0xE2 0x82 0xAC
        assert_eq!(decode_next(&[0xE2, 0x82, 0xAC]), (0x20AC, 3));
        // U+1F600 = 0xF0 0x9F 0x98 0x80
        assert_eq!(decode_next(&[0xF0, 0x9F, 0x98, 0x80]), (0x1F600, 4));
    }

    #[test]
    fn rejects_stray_continuation_byte() {
        assert_eq!(decode_next(&[0x80]), (INVALID_CODEPOINT, 1));
    }

    #[test]
    fn rejects_truncated_sequence() {
        assert_eq!(decode_next(&[0xE2, 0x82]), (INVALID_CODEPOINT, 1));
    }

    #[test]
    fn rejects_overlong_and_surrogate() {
        // Overlong encoding of '/' (0x2F) as two bytes.
        assert_eq!(decode_next(&[0xC0, 0xAF]), (INVALID_CODEPOINT, 1));
        // Surrogate half U+D800 encoded as three bytes.
        assert_eq!(decode_next(&[0xED, 0xA0, 0x80]), (INVALID_CODEPOINT, 1));
    }

    #[test]
    fn round_trips_encode() {
        for cp in [0x41u32, 0xE9, 0x20AC, 0x1F600] {
            let mut buf = [0u8; 4];
            let n = encode(cp, &mut buf);
            assert_eq!(decode_next(&buf[..n]), (cp as i64, n));
        }
    }

    #[test]
    fn is_valid_detects_malformed_input() {
        assert!(is_valid("hello, \u{20AC}".as_bytes()));
        assert!(!is_valid(&[b'h', b'i', 0xFF]));
    }
}
