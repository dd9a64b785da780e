//! Session transcript parsing and content extraction.
//!
//! Transcripts are append-only NDJSON written by the coding agent. Each line
//! is one entry; only `user` and `assistant` entries matter here. Reading is
//! tolerant: blank and unparseable lines are skipped.

pub mod extract;
pub mod filter;

pub use extract::{extract_content, SessionContent};
pub use filter::filter_entries;

use std::path::Path;

use serde_json::Value;

/// Load a transcript file into raw entries. Invalid lines are dropped.
pub fn load_transcript(path: &Path) -> anyhow::Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_skips_invalid_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("t.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"type":"user","message":{{"content":"hi"}}}}"#).unwrap();
        writeln!(f, "{{broken").unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"type":"file-history-snapshot"}}"#).unwrap();

        let entries = load_transcript(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(load_transcript(Path::new("/nonexistent/t.jsonl")).is_err());
    }
}
