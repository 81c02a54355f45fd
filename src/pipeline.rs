//! The publication load pipeline.
//!
//! Fetch works for every roster author, deduplicate by title, normalize,
//! apply the manual edit overlay, sort newest first. The resulting
//! collection is owned by the caller and replaced whole on the next load;
//! nothing is cached between loads.

use crate::config::{roster_id_set, RosterAuthor};
use crate::dedup::dedup_works;
use crate::edits::{apply_edits, EditDirective};
use crate::error::Result;
use crate::normalize::{normalize_work, Publication};
use crate::openalex::{RawWork, WorksClient};
use crate::query::sort_by_year_desc;
use std::collections::HashSet;
use tracing::info;

/// Assemble the final collection from already-fetched raw works.
///
/// Dedup runs on raw works (the collision policy reads raw fields); the
/// survivors are normalized, overlaid with edits, and sorted.
pub fn assemble(
    works: Vec<RawWork>,
    roster_ids: &HashSet<String>,
    edits: &[EditDirective],
) -> Vec<Publication> {
    let deduped = dedup_works(works);
    let normalized: Vec<Publication> = deduped
        .iter()
        .map(|w| normalize_work(w, roster_ids))
        .collect();

    let mut publications = apply_edits(normalized, edits);
    sort_by_year_desc(&mut publications);
    publications
}

/// Run one full load cycle against OpenAlex.
///
/// An empty roster yields an empty collection without any request. Any
/// failed author request aborts the whole load.
pub async fn load_publications(
    client: &WorksClient,
    roster: &[RosterAuthor],
    edits: &[EditDirective],
) -> Result<Vec<Publication>> {
    if roster.is_empty() {
        return Ok(Vec::new());
    }

    let works = client.works_for_roster(roster).await?;
    let publications = assemble(works, &roster_id_set(roster), edits);

    info!(count = publications.len(), "Publication load complete");
    Ok(publications)
}
