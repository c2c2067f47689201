//! Filename Sanitization - Names to Archive Keys
//!
//! Pure and total: every input maps to a non-empty, bounded,
//! filesystem-safe token.

/// Longest key we will emit; longer names are cut, not rejected.
pub const MAX_KEY_LEN: usize = 120;

/// Token used whenever sanitization would otherwise produce nothing.
pub const EMPTY_NAME_KEY: &str = "participant";

/// Map a raw participant name to a filesystem-safe archive key.
///
/// Whitespace runs collapse to single underscores, characters illegal on
/// common filesystems (`<>:"/\|?*` and C0 controls) are stripped, and the
/// result is capped at [`MAX_KEY_LEN`] characters. Empty input, or input
/// that strips down to nothing, yields [`EMPTY_NAME_KEY`].
pub fn sanitize_filename(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return EMPTY_NAME_KEY.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut in_whitespace = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace {
            out.push('_');
            in_whitespace = false;
        }
        if matches!(ch, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            continue;
        }
        if (ch as u32) < 0x20 {
            continue;
        }
        out.push(ch);
    }

    let capped: String = out.chars().take(MAX_KEY_LEN).collect();
    if capped.is_empty() {
        EMPTY_NAME_KEY.to_string()
    } else {
        capped
    }
}
