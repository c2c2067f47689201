//! Font Loading - Configured Path with System Fallbacks
//!
//! A bad or missing font is recoverable: the loader walks an ordered list of
//! well-known system fonts before giving up.

use log::warn;
use rusttype::Font;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("No usable font: {0} (and no fallback font was found)")]
    FontLoadFailed(String),
}

/// Ordered fallback font locations probed when the configured font cannot
/// be loaded. Kept short and common on purpose.
pub fn default_fallbacks() -> Vec<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
        "/Library/Fonts/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

/// Load the font at `primary`, recovering through `fallbacks` in order.
///
/// Each failed step is logged as a warning; only when every candidate is
/// exhausted does this return [`FontError::FontLoadFailed`].
pub fn load_font(primary: &Path, fallbacks: &[PathBuf]) -> Result<Font<'static>, FontError> {
    match load_one(primary) {
        Ok(font) => return Ok(font),
        Err(reason) => warn!("failed to load font {}: {}", primary.display(), reason),
    }

    for candidate in fallbacks {
        match load_one(candidate) {
            Ok(font) => {
                warn!("using fallback font {}", candidate.display());
                return Ok(font);
            }
            Err(_) => continue,
        }
    }

    Err(FontError::FontLoadFailed(primary.display().to_string()))
}

fn load_one(path: &Path) -> Result<Font<'static>, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    Font::try_from_vec(bytes).ok_or_else(|| "not a parseable outline font".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_font_anywhere_fails() {
        let err = load_font(Path::new("no/such/font.ttf"), &[]).unwrap_err();
        assert!(err.to_string().contains("no/such/font.ttf"));
    }

    #[test]
    fn test_garbage_font_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();
        assert!(load_font(&path, &[]).is_err());
    }

    #[test]
    fn test_fallback_chain_recovers() {
        // Only meaningful on hosts that carry one of the standard fonts.
        if default_fallbacks().iter().any(|p| p.exists()) {
            let font = load_font(Path::new("no/such/font.ttf"), &default_fallbacks());
            assert!(font.is_ok());
        }
    }
}
