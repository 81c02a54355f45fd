//! OpenAlex works API client.
//!
//! Fetches the works authored by each roster member, newest first. One GET
//! per author, issued concurrently and joined as a single point: if any one
//! request fails the whole load fails, with no partial result. The pipeline
//! never retries; transport-level backoff is OpenAlex's concern.
//!
//! API notes (per OpenAlex docs):
//! - `mailto:email` parameter joins the polite pool (10 req/s vs 1 req/s)
//! - works are filtered with `authorships.author.id:<id>`

use crate::config::RosterAuthor;
use crate::error::{LabpubsError, Result};
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// OpenAlex API base URL
const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Email for polite pool access
const POLITE_MAILTO: &str = "lab-site@example.com";

/// One raw work record as returned by OpenAlex.
///
/// Every field is optional; defaulting happens once, at the normalization
/// boundary, so downstream code never re-checks for absence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawWork {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub publication_year: Option<i32>,
    pub doi: Option<String>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub abstract_inverted_index: Option<HashMap<String, Vec<i64>>>,
    pub authorships: Option<Vec<RawAuthorship>>,
    pub primary_location: Option<RawLocation>,
    pub open_access: Option<RawOpenAccess>,
    pub primary_topic: Option<RawTopic>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthorship {
    pub author: Option<RawAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    pub source: Option<RawSource>,
    pub landing_page_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub source_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOpenAccess {
    pub oa_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTopic {
    pub display_name: Option<String>,
    pub subfield: Option<RawTopicLevel>,
    pub field: Option<RawTopicLevel>,
    pub domain: Option<RawTopicLevel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTopicLevel {
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<RawWork>,
}

/// OpenAlex works client.
pub struct WorksClient {
    client: Client,
}

impl WorksClient {
    /// Create a new client with the default timeout and user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("labpubs/1.0 (mailto:{})", POLITE_MAILTO))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch one author's works, newest first.
    pub async fn works_for_author(&self, author_id: &str, per_page: usize) -> Result<Vec<RawWork>> {
        let url = build_works_url(author_id, per_page);
        debug!(url = %url, author = author_id, "Fetching OpenAlex works");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(LabpubsError::Upstream {
                author: author_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body: WorksResponse = response.json().await.map_err(|e| {
            LabpubsError::Parse(format!(
                "Failed to parse OpenAlex response for author {}: {}",
                author_id, e
            ))
        })?;

        debug!(author = author_id, count = body.results.len(), "Parsed works");
        Ok(body.results)
    }

    /// Fetch works for every roster author concurrently and flatten the
    /// results. A failure for any one author aborts the entire load.
    pub async fn works_for_roster(&self, roster: &[RosterAuthor]) -> Result<Vec<RawWork>> {
        info!(authors = roster.len(), "Starting OpenAlex fan-out");

        let requests = roster
            .iter()
            .map(|author| self.works_for_author(&author.id, author.fetch_size()));

        let per_author = try_join_all(requests).await?;
        let all_works: Vec<RawWork> = per_author.into_iter().flatten().collect();

        info!(total = all_works.len(), "OpenAlex fan-out complete");
        Ok(all_works)
    }
}

/// Build the works URL for one author.
fn build_works_url(author_id: &str, per_page: usize) -> String {
    let mut url = format!(
        "{}/works?filter=authorships.author.id:{}&sort=publication_year:desc&per-page={}",
        OPENALEX_API_BASE,
        urlencoding::encode(author_id),
        per_page
    );

    if !POLITE_MAILTO.is_empty() {
        url.push_str(&format!("&mailto={}", POLITE_MAILTO));
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_works_url() {
        let url = build_works_url("A5012345678", 25);
        assert!(url.contains("filter=authorships.author.id:A5012345678"));
        assert!(url.contains("sort=publication_year:desc"));
        assert!(url.contains("per-page=25"));
        assert!(url.contains("mailto="));
    }

    #[test]
    fn test_parse_works_response() {
        let json = r#"{
            "meta": {"count": 1},
            "results": [{
                "id": "https://openalex.org/W1",
                "display_name": "Plant Networks",
                "publication_year": 2023,
                "doi": "https://doi.org/10.1/ABC",
                "type": "journal-article",
                "abstract_inverted_index": {"a": [0, 2], "b": [1]},
                "authorships": [
                    {"author": {"id": "https://openalex.org/A1", "display_name": "Ada"}}
                ],
                "primary_location": {
                    "source": {"display_name": "Nature", "type": "journal"},
                    "landing_page_url": "https://example.org/paper"
                },
                "open_access": {"oa_url": "https://example.org/oa.pdf"},
                "primary_topic": {
                    "display_name": "Ecology",
                    "subfield": {"display_name": "Plant Science"},
                    "field": {"display_name": "Agricultural Sciences"},
                    "domain": {"display_name": "Life Sciences"}
                }
            }]
        }"#;

        let body: WorksResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.results.len(), 1);

        let work = &body.results[0];
        assert_eq!(work.display_name.as_deref(), Some("Plant Networks"));
        assert_eq!(work.publication_year, Some(2023));
        assert_eq!(
            work.abstract_inverted_index.as_ref().unwrap()["a"],
            vec![0, 2]
        );
    }

    #[test]
    fn test_missing_results_key_is_empty() {
        let body: WorksResponse = serde_json::from_str(r#"{"meta": {}}"#).unwrap();
        assert!(body.results.is_empty());
    }
}
