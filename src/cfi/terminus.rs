//! Terminus splitting
//!
//! Reading systems hand around CFIs with their terminus attached
//! (`/4/2/1:15`, `/4/6@50:80`). Resolution needs the bare path and the
//! offsets separately. Malformed offsets are logged and read as zero.

use serde::Serialize;

/// A CFI path with its terminus split off
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CfiParts {
    pub cfi: String,
    /// Character offset from a `:n` terminus
    pub chr: usize,
    /// Spatial offset from an `@x:y` terminus
    pub x: i32,
    pub y: i32,
}

/// Split the terminus off a raw CFI string.
///
/// `@x:y` wins over `:n` when both separators appear.
pub fn split_cfi(cfi: &str) -> CfiParts {
    if let Some(at) = cfi.find('@') {
        let terminus = &cfi[at + 1..];
        let (x, y) = match terminus.split_once(':') {
            Some((x, y)) => (leading_int(x), leading_int(y)),
            None => {
                tracing::warn!("Unexpected terminating step format: {}", cfi);
                (0, 0)
            }
        };
        return CfiParts {
            cfi: cfi[..at].to_string(),
            x,
            y,
            ..CfiParts::default()
        };
    }

    if let Some(colon) = cfi.find(':') {
        let chr = leading_int(&cfi[colon + 1..]);
        return CfiParts {
            cfi: cfi[..colon].to_string(),
            chr: usize::try_from(chr).unwrap_or(0),
            ..CfiParts::default()
        };
    }

    CfiParts {
        cfi: cfi.to_string(),
        ..CfiParts::default()
    }
}

/// Leading integer of `s`, ignoring anything after it ("15[a,b]" -> 15).
/// Text without one reads as 0.
fn leading_int(s: &str) -> i32 {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with('-') || s.starts_with('+'));
    let digits = s[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|end| end + sign_len)
        .unwrap_or(s.len());
    match s[..digits].parse() {
        Ok(value) => value,
        Err(_) => {
            if !s.is_empty() {
                tracing::warn!("Unreadable CFI offset: {}", s);
            }
            0
        }
    }
}
