//! Site configuration: author roster and manual edit directives.
//!
//! Both files are JSONC (see [`crate::jsonc`]). The roster is required; the
//! edits file is optional and its absence means "no edits".

use crate::edits::EditDirective;
use crate::error::Result;
use crate::jsonc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Per-author fetch size when the roster entry has no override
pub const DEFAULT_MAX_WORKS: usize = 50;

/// One roster entry from the authors config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterAuthor {
    /// Short OpenAlex author id (e.g. "A5012345678")
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Per-author fetch-size override
    #[serde(default)]
    pub max_works: Option<usize>,
}

impl RosterAuthor {
    /// Result-page size to request for this author
    pub fn fetch_size(&self) -> usize {
        self.max_works.unwrap_or(DEFAULT_MAX_WORKS)
    }
}

/// Load the author roster. Any failure is fatal for the load attempt.
pub fn load_roster(path: &Path) -> Result<Vec<RosterAuthor>> {
    let roster: Vec<RosterAuthor> = jsonc::load(path)?;
    info!(count = roster.len(), path = %path.display(), "Loaded author roster");
    Ok(roster)
}

/// The set of roster ids, used for lab-author matching.
pub fn roster_id_set(roster: &[RosterAuthor]) -> HashSet<String> {
    roster.iter().map(|a| a.id.clone()).collect()
}

/// Load edit directives.
///
/// A missing file is an empty edit list, not an error. An unreadable or
/// malformed file is also tolerated (logged and treated as empty), matching
/// the optional nature of this configuration.
pub fn load_edits(path: &Path) -> Vec<EditDirective> {
    if !path.exists() {
        info!(path = %path.display(), "No edits file, skipping overlay");
        return Vec::new();
    }

    match jsonc::load::<Vec<EditDirective>>(path) {
        Ok(edits) => {
            info!(count = edits.len(), path = %path.display(), "Loaded edit directives");
            edits
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load edits, ignoring");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fetch_size_default() {
        let author = RosterAuthor {
            id: "A1".to_string(),
            name: "Ada".to_string(),
            max_works: None,
        };
        assert_eq!(author.fetch_size(), DEFAULT_MAX_WORKS);

        let override_author = RosterAuthor {
            max_works: Some(10),
            ..author
        };
        assert_eq!(override_author.fetch_size(), 10);
    }

    #[test]
    fn test_load_roster_jsonc() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(
            temp,
            "// lab roster\n[\n  {{\"id\": \"A1\", \"name\": \"Ada\", \"max_works\": 25}},\n  {{\"id\": \"A2\"}}\n]"
        )
        .unwrap();

        let roster = load_roster(temp.path()).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].fetch_size(), 25);
        assert_eq!(roster[1].name, "");
        assert_eq!(roster[1].fetch_size(), DEFAULT_MAX_WORKS);
    }

    #[test]
    fn test_missing_edits_file_is_empty() {
        let edits = load_edits(Path::new("/nonexistent/edit-publications.jsonc"));
        assert!(edits.is_empty());
    }

    #[test]
    fn test_malformed_edits_file_is_empty() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{{not valid").unwrap();
        let edits = load_edits(temp.path());
        assert!(edits.is_empty());
    }
}
