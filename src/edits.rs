//! Manual edit overlay.
//!
//! The site maintainers keep a small JSONC list of corrections on top of
//! whatever OpenAlex returns: `remove` directives drop a publication by
//! DOI, `add` directives append a literal record. Removal runs strictly
//! before addition, so an added record can reuse a just-removed DOI.
//! Malformed directives are skipped, never fatal.

use crate::normalize::{doi_to_thumb_path, normalize_doi, type_label, Publication};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// One edit directive, as written in the edits config file.
///
/// The file format is duck-typed: every field is optional and only the
/// ones relevant to the directive's `action` are read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDirective {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub journal_url: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub authors_text: String,
    #[serde(default)]
    pub lab_author_names: Vec<String>,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub subfield: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub domain: String,
    #[serde(rename = "type", default)]
    pub work_type: String,
    #[serde(rename = "rawType", default)]
    pub raw_type: String,
}

/// Apply edit directives to the deduplicated collection: removals first,
/// then additions.
pub fn apply_edits(publications: Vec<Publication>, edits: &[EditDirective]) -> Vec<Publication> {
    let remove_dois: HashSet<String> = edits
        .iter()
        .filter(|e| e.action == "remove")
        .map(|e| normalize_doi(&e.doi))
        .filter(|doi| !doi.is_empty())
        .collect();

    let mut result: Vec<Publication> = if remove_dois.is_empty() {
        publications
    } else {
        let before = publications.len();
        let kept: Vec<Publication> = publications
            .into_iter()
            // A publication without a DOI can never be removed by DOI
            .filter(|p| p.doi.is_empty() || !remove_dois.contains(&p.doi))
            .collect();
        debug!(removed = before - kept.len(), "Applied remove directives");
        kept
    };

    for directive in edits.iter().filter(|e| e.action == "add") {
        match synthesize(directive) {
            Some(publication) => result.push(publication),
            None => warn!(doi = %directive.doi, "Skipping add directive with no title or DOI"),
        }
    }

    result
}

/// Build a publication from an `add` directive's literal fields, applying
/// the same link-preference and thumbnail rules as fetched works.
fn synthesize(directive: &EditDirective) -> Option<Publication> {
    if directive.title.is_empty() && directive.doi.is_empty() {
        return None;
    }

    let doi = normalize_doi(&directive.doi);

    let doi_link = || {
        let s = directive.doi.trim();
        if s.starts_with("http") {
            s.to_string()
        } else {
            format!("https://doi.org/{}", doi)
        }
    };

    let link = if !directive.link.is_empty() {
        directive.link.clone()
    } else if !directive.doi.is_empty() {
        doi_link()
    } else if !directive.journal_url.is_empty() {
        directive.journal_url.clone()
    } else {
        String::new()
    };

    let journal_url = if !directive.journal_url.is_empty() {
        directive.journal_url.clone()
    } else if !directive.doi.is_empty() {
        doi_link()
    } else {
        link.clone()
    };

    let raw_type = if directive.work_type.is_empty() {
        &directive.raw_type
    } else {
        &directive.work_type
    };

    let id = if !directive.id.is_empty() {
        directive.id.clone()
    } else if !doi.is_empty() {
        format!("manual:{}", doi)
    } else if !directive.title.is_empty() {
        format!("manual:{}", directive.title)
    } else {
        format!("manual:{}", random_token())
    };

    let authors_text = if directive.authors.is_empty() {
        directive.authors_text.clone()
    } else {
        directive.authors.join(", ")
    };

    Some(Publication {
        id,
        title: if directive.title.is_empty() {
            "Untitled".to_string()
        } else {
            directive.title.clone()
        },
        year: directive.year,
        thumbnail_url: doi_to_thumb_path(&doi),
        doi,
        type_label: type_label(raw_type),
        abstract_text: directive.abstract_text.clone(),
        journal: directive.journal.clone(),
        journal_url,
        link,
        authors_text,
        lab_author_ids: Vec::new(),
        lab_author_names: directive.lab_author_names.clone(),
        topic: directive.topic.clone(),
        subfield: directive.subfield.clone(),
        field: directive.field.clone(),
        domain: directive.domain.clone(),
    })
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(doi: &str, title: &str) -> Publication {
        Publication {
            id: format!("https://openalex.org/{}", title),
            title: title.to_string(),
            doi: doi.to_string(),
            ..Default::default()
        }
    }

    fn remove(doi: &str) -> EditDirective {
        EditDirective {
            action: "remove".to_string(),
            doi: doi.to_string(),
            ..Default::default()
        }
    }

    fn add(title: &str, doi: &str) -> EditDirective {
        EditDirective {
            action: "add".to_string(),
            title: title.to_string(),
            doi: doi.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_remove_by_normalized_doi() {
        let pubs = vec![publication("10.1/abc", "Gone"), publication("10.1/def", "Kept")];
        let result = apply_edits(pubs, &[remove("https://doi.org/10.1/ABC")]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Kept");
    }

    #[test]
    fn test_doi_less_publication_is_never_removed() {
        let pubs = vec![publication("", "No Doi")];
        let result = apply_edits(pubs, &[remove("10.1/abc"), remove("")]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_remove_then_add_same_doi() {
        let pubs = vec![publication("10.1/abc", "Old Version")];
        let edits = vec![remove("10.1/abc"), add("New Version", "10.1/abc")];
        let result = apply_edits(pubs, &edits);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "New Version");
        assert_eq!(result[0].doi, "10.1/abc");
    }

    #[test]
    fn test_add_with_no_title_or_doi_is_skipped() {
        let bad = EditDirective {
            action: "add".to_string(),
            journal: "Nowhere".to_string(),
            ..Default::default()
        };
        let result = apply_edits(Vec::new(), &[bad]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        let odd = EditDirective {
            action: "replace".to_string(),
            doi: "10.1/abc".to_string(),
            ..Default::default()
        };
        let pubs = vec![publication("10.1/abc", "Untouched")];
        assert_eq!(apply_edits(pubs, &[odd]).len(), 1);
    }

    #[test]
    fn test_add_derives_links_and_thumbnail() {
        let result = apply_edits(Vec::new(), &[add("Field Guide", "DOI:10.1/GUIDE")]);
        let p = &result[0];

        assert_eq!(p.doi, "10.1/guide");
        assert_eq!(p.id, "manual:10.1/guide");
        assert_eq!(p.link, "https://doi.org/10.1/guide");
        assert_eq!(p.journal_url, "https://doi.org/10.1/guide");
        assert_eq!(p.thumbnail_url, "/thumbs/10_1_guide.jpg");
        assert!(p.lab_author_ids.is_empty());
    }

    #[test]
    fn test_add_http_doi_passes_through() {
        let result = apply_edits(Vec::new(), &[add("Linked", "https://doi.org/10.1/x")]);
        let p = &result[0];
        assert_eq!(p.doi, "10.1/x");
        // An http(s) DOI value is used verbatim as the link
        assert_eq!(p.link, "https://doi.org/10.1/x");
    }

    #[test]
    fn test_add_explicit_link_wins() {
        let mut directive = add("Preprint", "10.1/pre");
        directive.link = "https://example.org/preprint".to_string();
        let result = apply_edits(Vec::new(), &[directive]);

        assert_eq!(result[0].link, "https://example.org/preprint");
        assert_eq!(result[0].journal_url, "https://doi.org/10.1/pre");
    }

    #[test]
    fn test_add_without_doi_uses_title_id_and_no_thumbnail() {
        let result = apply_edits(Vec::new(), &[add("Book Of Plants", "")]);
        let p = &result[0];
        assert_eq!(p.id, "manual:Book Of Plants");
        assert_eq!(p.thumbnail_url, "");
        assert_eq!(p.link, "");
    }

    #[test]
    fn test_add_authors_joined() {
        let mut directive = add("Joint Work", "");
        directive.authors = vec!["Ada".to_string(), "Grace".to_string()];
        let result = apply_edits(Vec::new(), &[directive]);
        assert_eq!(result[0].authors_text, "Ada, Grace");
    }
}
