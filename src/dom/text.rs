//! UTF-16 offset helpers
//!
//! CFI character offsets count UTF-16 code units, while the tree stores
//! Rust strings. These helpers translate between the two.

/// Length of `s` in UTF-16 code units
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Byte index in `s` of the given UTF-16 offset.
///
/// Offsets past the end clamp to `s.len()`. An offset that falls inside a
/// surrogate pair rounds up to the next character boundary.
pub fn byte_index(s: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in s.char_indices() {
        if units >= utf16_offset {
            return idx;
        }
        units += ch.len_utf16();
    }
    s.len()
}

/// Slice `s` between two UTF-16 offsets
pub fn utf16_slice(s: &str, start: usize, end: usize) -> &str {
    let from = byte_index(s, start);
    let to = byte_index(s, end.max(start));
    &s[from..to]
}

/// UTF-16 unit at `offset`, if it is a plain space.
///
/// Used to step over the spaces that follow a word boundary.
pub fn is_space_at(s: &str, utf16_offset: usize) -> bool {
    let idx = byte_index(s, utf16_offset);
    idx < s.len() && s.as_bytes()[idx] == b' ' && utf16_len(&s[..idx]) == utf16_offset
}
