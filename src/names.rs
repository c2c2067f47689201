//! Name Ingestion - Participant List Loader
//!
//! Accepts either comma-delimited rows (first populated cell per row) or one
//! name per line. Malformed rows are skipped, never fatal; only a missing
//! file surfaces as an error.

use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Load, parse, and deduplicate the participant list at `path`.
///
/// The file is decoded as UTF-8 first, falling back to a permissive
/// latin-1 read when the bytes are not valid UTF-8. Empty or
/// whitespace-only content yields an empty list, not an error.
pub fn load_names(path: &Path) -> Result<Vec<String>, std::io::Error> {
    let bytes = fs::read(path)?;
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(
                "names file {} is not valid UTF-8, falling back to latin-1",
                path.display()
            );
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };
    let names = parse_names(&content);
    debug!("loaded {} unique names from {}", names.len(), path.display());
    Ok(names)
}

/// Parse name-list text into an ordered, deduplicated list.
///
/// A comma anywhere in the content selects delimiter mode; otherwise each
/// non-blank line is one name.
pub fn parse_names(content: &str) -> Vec<String> {
    let content = content.trim();
    if content.is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let has_comma = lines.iter().any(|l| l.contains(','));

    let raw = if has_comma {
        match parse_delimited(&lines) {
            Some(names) => names,
            None => {
                warn!("delimited parse failed, degrading to line mode");
                parse_lines(&lines)
            }
        }
    } else {
        parse_lines(&lines)
    };

    dedup_stable(raw)
}

fn parse_lines(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Delimiter mode: the first non-empty cell of each row is the name, the
/// rest of the row (emails, tags) is ignored. Returns `None` on structural
/// failure so the caller can degrade to line mode.
fn parse_delimited(lines: &[&str]) -> Option<Vec<String>> {
    let mut names = Vec::new();
    for line in lines {
        let cells = split_row(line)?;
        if let Some(cell) = cells.iter().map(|c| c.trim()).find(|c| !c.is_empty()) {
            names.push(cell.to_string());
        }
    }
    Some(names)
}

/// Minimal quote-aware row splitter. An unbalanced quote is a structural
/// failure (`None`), mirroring a CSV reader error.
fn split_row(line: &str) -> Option<Vec<String>> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                cells.push(std::mem::take(&mut cell));
            }
            _ => cell.push(ch),
        }
    }
    if in_quotes {
        return None;
    }
    cells.push(cell);
    Some(cells)
}

/// First-occurrence dedup, preserving input order.
fn dedup_stable(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_mode() {
        assert_eq!(parse_names("Alice\nBob\n\n  Carol  "), vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn test_delimiter_mode_takes_first_cell() {
        let input = "Alice,alice@x.com\nBob,bob@x.com";
        assert_eq!(parse_names(input), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_delimiter_mode_skips_leading_empty_cells() {
        assert_eq!(parse_names(",,Carol,c@x.com"), vec!["Carol"]);
    }

    #[test]
    fn test_dedup_preserves_order() {
        assert_eq!(parse_names("Alice\nAlice\nBob"), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_empty_content_yields_empty_list() {
        assert!(parse_names("").is_empty());
        assert!(parse_names("   \n\t\n").is_empty());
    }

    #[test]
    fn test_quoted_cells() {
        assert_eq!(parse_names("\"Smith, Jane\",jane@x.com"), vec!["Smith, Jane"]);
    }

    #[test]
    fn test_unbalanced_quote_degrades_to_line_mode() {
        // Structural failure: the whole content is re-read line by line.
        assert_eq!(
            parse_names("\"broken,row\nAlice,alice@x.com"),
            vec!["\"broken,row", "Alice,alice@x.com"]
        );
    }

    #[test]
    fn test_blank_rows_skipped() {
        assert_eq!(parse_names("Alice,a@x.com\n,,\nBob,b@x.com"), vec!["Alice", "Bob"]);
    }
}
