//! JSONC loading.
//!
//! Site configuration files (author roster, edit directives) are JSON with
//! comments. This module strips `/* ... */` block comments and `//` line
//! comments, then parses the remainder as strict JSON.
//!
//! Line comments are only recognised when preceded by start-of-line or
//! whitespace, so `https://...` inside string values survives stripping.

use crate::error::{LabpubsError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// Remove JSONC comments, leaving strict JSON.
///
/// Block comments are removed first, then line comments.
pub fn strip_comments(text: &str) -> String {
    let block = Regex::new(r"(?s)/\*.*?\*/")
        .unwrap_or_else(|_| Regex::new(r"").expect("Empty regex"));
    let line = Regex::new(r"(?m)(^|\s)//.*$")
        .unwrap_or_else(|_| Regex::new(r"").expect("Empty regex"));

    let without_block = block.replace_all(text, "");
    line.replace_all(&without_block, "$1").into_owned()
}

/// Parse JSONC text into a typed value.
pub fn from_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    let clean = strip_comments(text);
    serde_json::from_str(&clean)
        .map_err(|e| LabpubsError::Parse(format!("Invalid JSONC: {}", e)))
}

/// Read and parse a JSONC file.
///
/// A read failure is a `Load` error, a decode failure a `Parse` error.
/// No partial result is returned in either case.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "Loading JSONC file");
    let text = std::fs::read_to_string(path)
        .map_err(|e| LabpubsError::Load(format!("Failed to load {}: {}", path.display(), e)))?;
    from_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_strip_block_comments() {
        let text = "/* header */\n{\"a\": 1 /* inline */}";
        let clean = strip_comments(text);
        assert!(!clean.contains("header"));
        assert!(!clean.contains("inline"));
        let v: Value = serde_json::from_str(&clean).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_strip_line_comments() {
        let text = "{\n  // roster entry\n  \"a\": 1 // trailing\n}";
        let v: Value = from_str(text).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_urls_survive_stripping() {
        let text = "{\"link\": \"https://doi.org/10.1/abc\"} // note";
        let v: Value = from_str(text).unwrap();
        assert_eq!(v["link"], "https://doi.org/10.1/abc");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = from_str::<Value>("{not json").unwrap_err();
        assert!(matches!(err, LabpubsError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_is_load_error() {
        let err = load::<Value>(Path::new("/nonexistent/config.jsonc")).unwrap_err();
        assert!(matches!(err, LabpubsError::Load(_)));
    }

    #[test]
    fn test_load_roundtrip() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "// authors\n[{{\"id\": \"A1\"}}]").unwrap();
        let v: Value = load(temp.path()).unwrap();
        assert_eq!(v[0]["id"], "A1");
    }
}
