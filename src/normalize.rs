//! Work normalization.
//!
//! Turns one untrusted [`RawWork`] into a [`Publication`]: canonical DOI,
//! reconstructed abstract, human-readable type label, resolved links, the
//! flattened topic hierarchy, and the subset of authors on the lab roster.
//! All defaulting happens here; downstream code sees plain fields.

use crate::openalex::RawWork;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Placeholder title for works without one
const UNTITLED: &str = "Untitled";

/// One normalized publication, the unit everything downstream operates on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Publication {
    /// Source work identifier (stable key)
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    /// Lowercase, prefix-stripped canonical DOI, or empty
    pub doi: String,
    pub type_label: String,
    pub abstract_text: String,
    pub journal: String,
    pub journal_url: String,
    pub link: String,
    pub authors_text: String,
    pub lab_author_ids: Vec<String>,
    pub lab_author_names: Vec<String>,
    pub topic: String,
    pub subfield: String,
    pub field: String,
    pub domain: String,
    pub thumbnail_url: String,
}

/// Normalize a DOI into a stable key: strip a leading
/// `http(s)://(dx.)?doi.org/` or `doi:` prefix, lowercase the remainder.
/// Idempotent.
pub fn normalize_doi(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }

    let prefix = Regex::new(r"(?i)^https?://(dx\.)?doi\.org/")
        .unwrap_or_else(|_| Regex::new(r"").expect("Empty regex"));
    let scheme = Regex::new(r"(?i)^doi:")
        .unwrap_or_else(|_| Regex::new(r"").expect("Empty regex"));

    let s = prefix.replace(s, "");
    let s = scheme.replace(&s, "");
    s.to_lowercase()
}

/// Reconstruct abstract text from an inverted index (word -> positions).
///
/// Builds a position-indexed array, renders gaps as empty strings, joins
/// with single spaces and trims. OpenAlex serves abstracts in this form
/// for legal reasons.
pub fn reconstruct_abstract(inverted: &HashMap<String, Vec<i64>>) -> String {
    let max_pos = inverted
        .values()
        .flatten()
        .copied()
        .filter(|p| *p >= 0)
        .max();

    let max_pos = match max_pos {
        Some(p) => p as usize,
        None => return String::new(),
    };

    let mut slots: Vec<&str> = vec![""; max_pos + 1];
    for (word, positions) in inverted {
        for &pos in positions {
            if pos >= 0 && (pos as usize) <= max_pos {
                slots[pos as usize] = word.as_str();
            }
        }
    }

    slots.join(" ").trim().to_string()
}

/// Map an OpenAlex type tag to a display label.
///
/// Known tags use a fixed table; unknown non-empty tags are humanized
/// (underscores/hyphens to spaces, words capitalized); an empty tag is
/// "Other".
pub fn type_label(raw_type: &str) -> String {
    let t = raw_type.trim().to_lowercase();

    match t.as_str() {
        "journal-article" => "Article".to_string(),
        "review" | "review-article" => "Review".to_string(),
        "dataset" => "Dataset".to_string(),
        "book-chapter" => "Book chapter".to_string(),
        "proceedings-article" => "Conference article".to_string(),
        "report" => "Report".to_string(),
        "" => "Other".to_string(),
        _ => humanize_tag(&t),
    }
}

fn humanize_tag(tag: &str) -> String {
    let spaced = tag.replace(['_', '-'], " ");
    let mut pretty = String::with_capacity(spaced.len());
    let mut at_word_start = true;

    for c in spaced.chars() {
        if at_word_start {
            pretty.extend(c.to_uppercase());
        } else {
            pretty.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }

    pretty
}

/// Turn a normalized DOI into the thumbnail path convention:
/// non-alphanumeric runs become `_`, under `/thumbs/` with a `.jpg`
/// extension. Empty DOI means no thumbnail.
pub fn doi_to_thumb_path(normalized_doi: &str) -> String {
    if normalized_doi.is_empty() {
        return String::new();
    }
    format!("/thumbs/{}.jpg", doi_to_thumb_token(normalized_doi))
}

/// Filesystem-safe token for a normalized DOI.
pub fn doi_to_thumb_token(normalized_doi: &str) -> String {
    let mut token = String::with_capacity(normalized_doi.len());
    let mut last_was_sep = false;

    for c in normalized_doi.chars() {
        if c.is_ascii_alphanumeric() {
            token.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            token.push('_');
            last_was_sep = true;
        }
    }

    token
}

/// Trailing path segment of a full OpenAlex author id
/// (`https://openalex.org/A5012345678` -> `A5012345678`).
pub fn short_author_id(full: &str) -> &str {
    full.rsplit('/').next().unwrap_or(full)
}

fn doi_url(normalized_doi: &str) -> String {
    if normalized_doi.is_empty() {
        String::new()
    } else {
        format!("https://doi.org/{}", normalized_doi)
    }
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Normalize one raw work against the roster id set.
pub fn normalize_work(work: &RawWork, roster_ids: &HashSet<String>) -> Publication {
    let authorships = work.authorships.as_deref().unwrap_or(&[]);

    let all_authors: Vec<&str> = authorships
        .iter()
        .filter_map(|au| au.author.as_ref()?.display_name.as_deref())
        .collect();

    let mut lab_author_ids = Vec::new();
    let mut lab_author_names = Vec::new();
    for au in authorships {
        let author = match au.author.as_ref() {
            Some(a) => a,
            None => continue,
        };
        let full_id = match author.id.as_deref() {
            Some(id) => id,
            None => continue,
        };
        let short = short_author_id(full_id);
        if roster_ids.contains(short) {
            lab_author_ids.push(short.to_string());
            if let Some(name) = author.display_name.clone() {
                lab_author_names.push(name);
            }
        }
    }

    let label = type_label(work.work_type.as_deref().unwrap_or(""));

    let mut abstract_text = match work.abstract_text.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => work
            .abstract_inverted_index
            .as_ref()
            .map(reconstruct_abstract)
            .unwrap_or_default(),
    };
    // Dataset records carry boilerplate abstracts; the site never shows them
    if label == "Dataset" {
        abstract_text = String::new();
    }

    let location = work.primary_location.as_ref();
    let source = location.and_then(|l| l.source.as_ref());
    let landing_page = location
        .and_then(|l| l.landing_page_url.as_deref())
        .unwrap_or("");
    let oa_url = work
        .open_access
        .as_ref()
        .and_then(|oa| oa.oa_url.as_deref())
        .unwrap_or("");

    let journal = first_non_empty(&[
        source.and_then(|s| s.display_name.as_deref()).unwrap_or(""),
        landing_page,
    ]);

    let doi = normalize_doi(work.doi.as_deref().unwrap_or(""));
    let doi_link = doi_url(&doi);
    let work_id = work.id.as_deref().unwrap_or("");

    let link = first_non_empty(&[landing_page, oa_url, &doi_link, work_id]);
    let journal_url = first_non_empty(&[&doi_link, &link]);
    let thumbnail_url = doi_to_thumb_path(&doi);

    let topic = work.primary_topic.as_ref();
    let topic_name = |level: Option<&crate::openalex::RawTopicLevel>| {
        level
            .and_then(|l| l.display_name.clone())
            .unwrap_or_default()
    };

    Publication {
        id: work_id.to_string(),
        title: work
            .display_name
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string()),
        year: work.publication_year,
        doi,
        type_label: label,
        abstract_text,
        journal,
        journal_url,
        link,
        authors_text: all_authors.join(", "),
        lab_author_ids,
        lab_author_names,
        topic: topic
            .and_then(|t| t.display_name.clone())
            .unwrap_or_default(),
        subfield: topic_name(topic.and_then(|t| t.subfield.as_ref())),
        field: topic_name(topic.and_then(|t| t.field.as_ref())),
        domain: topic_name(topic.and_then(|t| t.domain.as_ref())),
        thumbnail_url,
    }
}
