//! Deduplication of raw works by normalized title.
//!
//! OpenAlex returns near-identical records for the same work across author
//! queries (and sometimes a dataset twin of a journal article). Works are
//! accumulated into a collection keyed by normalized title, falling back to
//! the work id when the title is empty; collisions resolve through a fixed
//! preference order. The outcome is independent of insertion order: each
//! rule is a total order and ties fall through to the next.

use crate::openalex::RawWork;
use std::collections::HashMap;

/// Normalize a title into a dedup key: lowercase, every run of
/// non-alphanumeric characters becomes a single space, trimmed.
pub fn title_key(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut key = String::with_capacity(lowered.len());
    let mut last_was_space = false;

    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c);
            last_was_space = false;
        } else if !last_was_space {
            key.push(' ');
            last_was_space = true;
        }
    }

    key.trim().to_string()
}

/// Dedup key for one work: title key, else the work id. Works without an
/// id are not keyable and get dropped from the pipeline.
pub fn dedup_key(work: &RawWork) -> Option<String> {
    let id = work.id.as_deref()?;
    let key = title_key(work.display_name.as_deref().unwrap_or(""));
    if key.is_empty() {
        Some(id.to_string())
    } else {
        Some(key)
    }
}

fn is_dataset(work: &RawWork) -> bool {
    work.work_type
        .as_deref()
        .map(|t| t.to_lowercase() == "dataset")
        .unwrap_or(false)
}

fn has_journal_source(work: &RawWork) -> bool {
    work.primary_location
        .as_ref()
        .and_then(|l| l.source.as_ref())
        .and_then(|s| s.source_type.as_deref())
        .map(|t| t.to_lowercase().contains("journal"))
        .unwrap_or(false)
}

fn year_or_zero(work: &RawWork) -> i32 {
    work.publication_year.unwrap_or(0)
}

/// Decide whether an incoming record replaces the one already held under
/// the same key. First decisive rule wins:
/// 1. a non-dataset beats a dataset;
/// 2. a record whose primary source type contains "journal" beats one
///    whose does not (substring check on the free-text source type);
/// 3. the larger publication year wins;
/// 4. otherwise the first-seen record stays.
fn incoming_wins(existing: &RawWork, incoming: &RawWork) -> bool {
    let existing_ds = is_dataset(existing);
    let incoming_ds = is_dataset(incoming);
    if existing_ds != incoming_ds {
        return existing_ds;
    }

    let existing_journal = has_journal_source(existing);
    let incoming_journal = has_journal_source(incoming);
    if existing_journal != incoming_journal {
        return incoming_journal;
    }

    year_or_zero(incoming) > year_or_zero(existing)
}

/// Accumulate works into a deduplicated collection.
///
/// First-seen order of keys is preserved so that downstream sorting stays
/// deterministic for same-year records.
pub fn dedup_works(works: Vec<RawWork>) -> Vec<RawWork> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut deduped: Vec<RawWork> = Vec::new();

    for work in works {
        let key = match dedup_key(&work) {
            Some(k) => k,
            None => continue,
        };

        match index.get(&key) {
            Some(&slot) => {
                if incoming_wins(&deduped[slot], &work) {
                    deduped[slot] = work;
                }
            }
            None => {
                index.insert(key, deduped.len());
                deduped.push(work);
            }
        }
    }

    deduped
}
