//! UTF-8 Safe String Utilities
//!
//! Document offsets are byte offsets, and many of them come from places that
//! know nothing about character boundaries: pointer hit-testing, offsets
//! mapped through concurrent edits, or fixed-size prompt windows. These
//! helpers adjust such offsets to valid boundaries before slicing.
//!
//! # Example
//! ```ignore
//! use crate::string_utils::{safe_slice, window_before};
//!
//! let text = "Hei på deg";
//! let slice = safe_slice(text, 4, 7); // Safe even if indices are mid-char
//! let tail = window_before(text, text.len(), 3); // "deg"
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Character Boundary Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the largest index `<= index` that is on a UTF-8 character boundary.
///
/// Indices past the end clamp to the string length.
#[inline]
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Returns the smallest index `>= index` that is on a UTF-8 character boundary.
#[inline]
pub fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

// ─────────────────────────────────────────────────────────────────────────────
// Safe Slicing Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Safely slice a string from `start` to `end`.
///
/// `start` is floored and `end` is ceiled to character boundaries; an empty
/// string is returned when the adjusted range is empty.
#[inline]
pub fn safe_slice(s: &str, start: usize, end: usize) -> &str {
    let start = floor_char_boundary(s, start);
    let end = ceil_char_boundary(s, end);

    if start >= end {
        return "";
    }

    &s[start..end]
}

/// At most `max_bytes` of text ending at `pos`, cut on a character boundary.
pub fn window_before(s: &str, pos: usize, max_bytes: usize) -> &str {
    let end = floor_char_boundary(s, pos);
    let start = ceil_char_boundary(s, end.saturating_sub(max_bytes));
    &s[start..end]
}

/// At most `max_bytes` of text starting at `pos`, cut on a character boundary.
pub fn window_after(s: &str, pos: usize, max_bytes: usize) -> &str {
    let start = floor_char_boundary(s, pos);
    let end = floor_char_boundary(s, start.saturating_add(max_bytes));
    &s[start..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_char_boundary_multibyte() {
        let s = "på"; // 'å' is 2 bytes at index 1..3
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 1), 1);
        assert_eq!(floor_char_boundary(s, 99), 3);
    }

    #[test]
    fn test_ceil_char_boundary_multibyte() {
        let s = "på";
        assert_eq!(ceil_char_boundary(s, 2), 3);
        assert_eq!(ceil_char_boundary(s, 0), 0);
    }

    #[test]
    fn test_safe_slice_mid_char() {
        let text = "Hello 世界!";
        assert_eq!(safe_slice(text, 6, 12), "世界");
        assert_eq!(safe_slice(text, 7, 8), "世");
        assert_eq!(safe_slice(text, 5, 5), "");
    }

    #[test]
    fn test_window_before() {
        let text = "abcdef";
        assert_eq!(window_before(text, 4, 2), "cd");
        assert_eq!(window_before(text, 4, 100), "abcd");
        // A window that would start inside 'é' starts after it instead.
        assert_eq!(window_before("aébc", 5, 3), "bc");
    }

    #[test]
    fn test_window_after() {
        let text = "abcdef";
        assert_eq!(window_after(text, 4, 100), "ef");
        assert_eq!(window_after(text, 0, 3), "abc");
        assert_eq!(window_after("aébc", 0, 2), "a");
    }
}
