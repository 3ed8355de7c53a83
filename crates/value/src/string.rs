//! String: a refcounted flexible UTF-8 byte buffer with a lazily computed,
//! cached hash.
//!
//! There's no explicit allocated-capacity field or trailing NUL byte on the
//! payload: `Vec<u8>` already tracks its own allocated capacity (so the
//! "remaining capacity suffices" check in `append` is just
//! `Vec::capacity() - Vec::len()`), and a NUL terminator is a C-API
//! convenience this crate's all-Rust callers never need. What matters is the
//! specific growth formula, not whatever factor `Vec::reserve` would
//! otherwise pick, and that's exactly what `dynval_core::alloc` provides.

use std::cell::Cell;
use std::rc::Rc;

use dynval_core::{alloc, clamp_range, decode_next, encode, is_valid};

/// Refcounted string payload. Strings never alias on slice: slicing always
/// allocates a fresh buffer, so there's no `(offset, size)` window on the
/// handle the way `Array` has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqValueString(Rc<StringPayload>);

#[derive(Debug)]
struct StringPayload {
    bytes: Vec<u8>,
    hash: Cell<Option<u32>>,
}

impl PartialEq for StringPayload {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}
impl Eq for StringPayload {}

const MURMUR_SEED: u32 = 0x432A_9843;

impl SeqValueString {
    fn from_bytes_unchecked(bytes: Vec<u8>) -> Self {
        SeqValueString(Rc::new(StringPayload {
            bytes,
            hash: Cell::new(None),
        }))
    }

    /// `from_bytes`: valid UTF-8 copies verbatim; invalid input is rewritten,
    /// substituting U+FFFD for every malformed byte/sequence.
    pub fn from_bytes(buf: &[u8]) -> Self {
        if is_valid(buf) {
            return Self::from_bytes_unchecked(buf.to_vec());
        }
        // Worst case each malformed byte becomes a 3-byte U+FFFD sequence,
        // so reserve up to 3*len + 1 bytes up front.
        let mut out = Vec::with_capacity(buf.len() * 3 + 1);
        let mut rest = buf;
        while !rest.is_empty() {
            let (cp, consumed) = decode_next(rest);
            if cp == dynval_core::utf8::INVALID_CODEPOINT {
                out.extend_from_slice("\u{FFFD}".as_bytes());
            } else {
                out.extend_from_slice(&rest[..consumed]);
            }
            rest = &rest[consumed..];
        }
        Self::from_bytes_unchecked(out)
    }

    pub fn empty(cap: usize) -> Self {
        Self::from_bytes_unchecked(Vec::with_capacity(cap))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0.bytes
    }

    /// Safety of `from_utf8_unchecked`: every `StringPayload` is built only
    /// through constructors (`from_bytes`, `empty`, `append*`) that
    /// maintain the "always valid UTF-8" invariant.
    pub fn as_str(&self) -> &str {
        unsafe { std::str::from_utf8_unchecked(&self.0.bytes) }
    }

    pub fn refcount(&self) -> i64 {
        Rc::strong_count(&self.0) as i64
    }

    pub fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn length_bytes(&self) -> i64 {
        self.0.bytes.len() as i64
    }

    pub fn length_codepoints(&self) -> i64 {
        let mut n = 0i64;
        let mut rest = self.as_bytes();
        while !rest.is_empty() {
            let (_, consumed) = decode_next(rest);
            rest = &rest[consumed..];
            n += 1;
        }
        n
    }

    /// Appends `buf` in place when the payload is uniquely held and spare
    /// capacity suffices; otherwise allocates a fresh buffer of size
    /// `2*(cur+len)` (minimum 32).
    pub fn append(mut self, buf: &[u8]) -> Self {
        let cur_len = self.0.bytes.len();
        let capacity_suffices = self.0.bytes.capacity() - cur_len >= buf.len();

        if let Some(payload) = Rc::get_mut(&mut self.0) {
            if capacity_suffices {
                payload.bytes.extend_from_slice(buf);
            } else {
                let mut grown = Vec::new();
                alloc::reserve_exact_or_abort(&mut grown, alloc::doubling_capacity(cur_len, buf.len()));
                grown.extend_from_slice(&payload.bytes);
                grown.extend_from_slice(buf);
                payload.bytes = grown;
            }
            payload.hash.set(None);
            self
        } else {
            let mut grown = Vec::new();
            alloc::reserve_exact_or_abort(&mut grown, alloc::doubling_capacity(cur_len, buf.len()));
            grown.extend_from_slice(&self.0.bytes);
            grown.extend_from_slice(buf);
            Self::from_bytes_unchecked(grown)
        }
    }

    pub fn append_codepoint(self, cp: u32) -> Self {
        let mut out = [0u8; 4];
        let n = encode(cp, &mut out);
        self.append(&out[..n])
    }

    pub fn append_str(self, other: &SeqValueString) -> Self {
        self.append(other.as_bytes())
    }

    /// Validates `buf` as UTF-8 first; malformed input is replaced with
    /// U+FFFD before appending, same policy as `from_bytes`.
    pub fn append_buf(self, buf: &[u8]) -> Self {
        if is_valid(buf) {
            self.append(buf)
        } else {
            self.append(Self::from_bytes(buf).as_bytes())
        }
    }

    /// Appends formatted text. This crate has no variadic C ABI to support,
    /// so callers build a [`std::fmt::Arguments`] with `format_args!`
    /// (Rust's native equivalent of a format string plus its arguments),
    /// and this grows a scratch buffer exactly like `append` does.
    pub fn format(self, args: std::fmt::Arguments<'_>) -> Self {
        use std::fmt::Write;
        let mut scratch = String::new();
        let _ = scratch.write_fmt(args);
        self.append(scratch.as_bytes())
    }

    pub fn concat(self, other: &SeqValueString) -> Self {
        self.append_str(other)
    }

    /// MurmurHash3-32 of the byte content, cached after first computation.
    pub fn hash(&self) -> u32 {
        if let Some(h) = self.0.hash.get() {
            return h;
        }
        let h = murmur3_32(self.as_bytes(), MURMUR_SEED);
        self.0.hash.set(Some(h));
        h
    }

    /// Clamps with the shared slice-clamp policy on *code-point* indices,
    /// then walks UTF-8 to find the matching byte offsets. Always
    /// allocates a fresh string.
    pub fn slice(&self, start: i64, end: i64) -> Self {
        let len_cp = self.length_codepoints();
        let (s, e) = clamp_range(len_cp, start, end);

        let mut byte_start = None;
        let mut byte_end = self.as_bytes().len();
        let mut idx = 0usize;
        let mut pos = 0usize;
        let mut rest = self.as_bytes();
        if s == e {
            return Self::empty(0);
        }
        while !rest.is_empty() {
            if idx == s {
                byte_start = Some(pos);
            }
            if idx == e {
                byte_end = pos;
                break;
            }
            let (_, consumed) = decode_next(rest);
            rest = &rest[consumed..];
            pos += consumed;
            idx += 1;
        }
        let start_byte = byte_start.unwrap_or(pos);
        Self::from_bytes_unchecked(self.as_bytes()[start_byte..byte_end].to_vec())
    }

    /// Code-point indices at which `needle` occurs, non-overlapping: each
    /// match advances past its own length rather than scanning one code
    /// point forward.
    pub fn indexes(&self, needle: &SeqValueString) -> Vec<i64> {
        if needle.as_bytes().is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let haystack = self.as_bytes();
        let needle_bytes = needle.as_bytes();
        let mut byte_pos = 0usize;
        let mut cp_idx = 0i64;
        while byte_pos <= haystack.len().saturating_sub(needle_bytes.len()) {
            if &haystack[byte_pos..byte_pos + needle_bytes.len()] == needle_bytes {
                out.push(cp_idx);
                let mut advanced = 0usize;
                let mut rest = &haystack[byte_pos..];
                while advanced < needle_bytes.len() {
                    let (_, consumed) = decode_next(rest);
                    rest = &rest[consumed..];
                    advanced += consumed;
                    cp_idx += 1;
                }
                byte_pos += needle_bytes.len();
            } else {
                let (_, consumed) = decode_next(&haystack[byte_pos..]);
                byte_pos += consumed;
                cp_idx += 1;
            }
        }
        out
    }

    /// Splits per code point when `sep` is empty; otherwise splits
    /// byte-wise on `sep`, appending an empty tail element iff the string
    /// ends with `sep`.
    pub fn split(&self, sep: &SeqValueString) -> Vec<Self> {
        if sep.as_bytes().is_empty() {
            let mut out = Vec::new();
            let mut rest = self.as_bytes();
            while !rest.is_empty() {
                let (_, consumed) = decode_next(rest);
                out.push(Self::from_bytes_unchecked(rest[..consumed].to_vec()));
                rest = &rest[consumed..];
            }
            return out;
        }
        self.as_str()
            .split(sep.as_str())
            .map(Self::from_bytes_unchecked_str)
            .collect()
    }

    fn from_bytes_unchecked_str(s: &str) -> Self {
        Self::from_bytes_unchecked(s.as_bytes().to_vec())
    }

}

/// Sentinel distinguishing `repeat`'s two non-success outcomes so the
/// `Value`-level wrapper can map them to `Null` vs `invalid_with_message`.
pub enum RepeatError {
    Negative,
    TooLong,
}

impl SeqValueString {
    /// `n < 0` returns [`RepeatError::Negative`] (the `Value` layer maps
    /// this to `null`). `n*len >= INT_MAX` returns [`RepeatError::TooLong`]
    /// (mapped to `invalid_with_message("Repeat string result too
    /// long")`). Doubling keeps total copying `O(result length)`.
    pub fn repeat_checked(&self, n: i64) -> Result<Self, RepeatError> {
        if n < 0 {
            return Err(RepeatError::Negative);
        }
        let len = self.as_bytes().len() as i64;
        if len != 0 && n.checked_mul(len).is_none_or(|total| total >= i64::from(i32::MAX)) {
            return Err(RepeatError::TooLong);
        }
        if n == 0 || len == 0 {
            return Ok(Self::empty(0));
        }
        // Doubling: build "s", "ss", "ssss", ... and top up the remainder,
        // so total copying is O(result length) rather than O(n * length).
        let mut result = self.as_bytes().to_vec();
        let mut have = 1i64;
        while have * 2 <= n {
            let snapshot = result.clone();
            result.extend_from_slice(&snapshot);
            have *= 2;
        }
        if have < n {
            let remaining = (n - have) as usize;
            let base = self.as_bytes();
            for _ in 0..remaining {
                result.extend_from_slice(base);
            }
        }
        Ok(Self::from_bytes_unchecked(result))
    }

    /// Decomposes the string into an array of code-point integers.
    pub fn explode(&self) -> Vec<i64> {
        let mut out = Vec::new();
        let mut rest = self.as_bytes();
        while !rest.is_empty() {
            let (cp, consumed) = decode_next(rest);
            out.push(cp);
            rest = &rest[consumed..];
        }
        out
    }

    /// Builds a string from an array of code-point integers. Code points
    /// outside `[0, 0x10FFFF]` or in the UTF-16 surrogate range become
    /// U+FFFD.
    pub fn implode(codepoints: &[i64]) -> Self {
        let mut out = Vec::with_capacity(codepoints.len() * 2);
        for &cp in codepoints {
            let valid = (0..=0x10FFFF).contains(&cp) && !(0xD800..=0xDFFF).contains(&cp);
            let mut buf = [0u8; 4];
            let n = if valid {
                encode(cp as u32, &mut buf)
            } else {
                encode(0xFFFD, &mut buf)
            };
            out.extend_from_slice(&buf[..n]);
        }
        Self::from_bytes_unchecked(out)
    }
}

/// MurmurHash3 x86 32-bit, used with seed `0x432A9843` for string hashing.
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes(chunk.try_into().unwrap());
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let mut k = 0u32;
        for (i, &b) in remainder.iter().enumerate() {
            k |= u32::from(b) << (8 * i);
        }
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_copied_verbatim() {
        let s = SeqValueString::from_bytes("héllo".as_bytes());
        assert_eq!(s.as_str(), "héllo");
    }

    #[test]
    fn invalid_utf8_replaced_with_u_fffd() {
        let s = SeqValueString::from_bytes(&[b'h', b'i', 0xFF]);
        assert_eq!(s.as_str(), "hi\u{FFFD}");
    }

    #[test]
    fn hash_is_cached_and_stable() {
        let s = SeqValueString::from_bytes(b"hello");
        let h1 = s.hash();
        let h2 = s.hash();
        assert_eq!(h1, h2);
    }

    #[test]
    fn append_grows_in_place_when_unique() {
        let s = SeqValueString::empty(32).append(b"ab").append(b"cd");
        assert_eq!(s.as_str(), "abcd");
    }

    #[test]
    fn append_copies_when_shared() {
        let base = SeqValueString::from_bytes(b"ab");
        let shared = base.clone();
        let grown = base.append(b"cd");
        assert_eq!(grown.as_str(), "abcd");
        assert_eq!(shared.as_str(), "ab");
    }

    #[test]
    fn slice_round_trips_codepoint_indices() {
        let s = SeqValueString::from_bytes("abécd".as_bytes());
        assert_eq!(s.slice(1, 3).as_str(), "bé");
    }

    #[test]
    fn split_on_separator_keeps_trailing_empty() {
        let s = SeqValueString::from_bytes(b"a,b,");
        let sep = SeqValueString::from_bytes(b",");
        let parts: Vec<String> = s.split(&sep).iter().map(|p| p.as_str().to_string()).collect();
        assert_eq!(parts, vec!["a", "b", ""]);
    }

    #[test]
    fn split_empty_separator_splits_per_codepoint() {
        let s = SeqValueString::from_bytes("aé".as_bytes());
        let sep = SeqValueString::empty(0);
        let parts: Vec<String> = s.split(&sep).iter().map(|p| p.as_str().to_string()).collect();
        assert_eq!(parts, vec!["a", "é"]);
    }

    #[test]
    fn repeat_builds_expected_string() {
        let s = SeqValueString::from_bytes(b"ab");
        let repeated = s.repeat_checked(3).ok().unwrap();
        assert_eq!(repeated.as_str(), "ababab");
    }

    #[test]
    fn repeat_negative_is_an_error() {
        assert!(matches!(
            SeqValueString::from_bytes(b"a").repeat_checked(-1),
            Err(RepeatError::Negative)
        ));
    }

    #[test]
    fn repeat_overflow_is_an_error() {
        assert!(matches!(
            SeqValueString::from_bytes(b"ab").repeat_checked(i64::from(i32::MAX)),
            Err(RepeatError::TooLong)
        ));
    }

    #[test]
    fn explode_implode_round_trip() {
        let s = SeqValueString::from_bytes("aé".as_bytes());
        let cps = s.explode();
        assert_eq!(SeqValueString::implode(&cps).as_str(), "aé");
    }

    #[test]
    fn implode_replaces_surrogates_and_out_of_range() {
        let s = SeqValueString::implode(&[0xD800, 0x110000, 0x41]);
        assert_eq!(s.as_str(), "\u{FFFD}\u{FFFD}A");
    }

    #[test]
    fn indexes_are_non_overlapping() {
        let s = SeqValueString::from_bytes(b"aaaa");
        let needle = SeqValueString::from_bytes(b"aa");
        assert_eq!(s.indexes(&needle), vec![0, 2]);
    }
}
