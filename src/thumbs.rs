//! Thumbnail maintenance.
//!
//! Each publication thumbnail lives at `<thumbs-dir>/<doi-token>.jpg`. This
//! module collects the distinct normalized DOIs across all fetched works
//! and downloads one stock photo per missing file. Already-used photo ids
//! are remembered in a ledger file inside the thumbs directory so the same
//! image is never assigned to two DOIs.
//!
//! This is an offline maintenance tool, not part of the load pipeline: a
//! failed download is logged and skipped, never fatal for the run.

use crate::error::{LabpubsError, Result};
use crate::normalize::{doi_to_thumb_token, normalize_doi};
use crate::openalex::RawWork;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stock photo search endpoint
const STOCK_API_URL: &str = "https://api.unsplash.com/photos/random";

/// Search query matching the lab's visual theme
pub const DEFAULT_STOCK_QUERY: &str = "plants biodiversity";

/// Ledger of already-used stock photo ids, kept next to the thumbnails
const USED_LEDGER_FILE: &str = "_unsplash-used.json";

/// Attempts before giving up on finding an unused photo
const MAX_PICK_TRIES: usize = 10;

/// Distinct normalized DOIs across all works, first-seen order.
pub fn distinct_dois(works: &[RawWork]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dois = Vec::new();

    for work in works {
        let doi = normalize_doi(work.doi.as_deref().unwrap_or(""));
        if !doi.is_empty() && seen.insert(doi.clone()) {
            dois.push(doi);
        }
    }

    dois
}

/// Thumbnail file name for a normalized DOI.
pub fn thumb_file_name(normalized_doi: &str) -> String {
    format!("{}.jpg", doi_to_thumb_token(normalized_doi))
}

/// Persistent set of stock photo ids already assigned to some DOI.
pub struct UsedLedger {
    path: PathBuf,
    ids: HashSet<String>,
}

impl UsedLedger {
    /// Load the ledger from the thumbs directory.
    ///
    /// A missing or invalid file starts an empty ledger.
    pub fn load(thumbs_dir: &Path) -> Self {
        let path = thumbs_dir.join(USED_LEDGER_FILE);

        let ids = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(list) => {
                    debug!(count = list.len(), "Loaded used-photo ledger");
                    list.into_iter().collect()
                }
                Err(e) => {
                    warn!(error = %e, "Invalid used-photo ledger, starting fresh");
                    HashSet::new()
                }
            },
            Err(_) => HashSet::new(),
        };

        Self { path, ids }
    }

    pub fn contains(&self, photo_id: &str) -> bool {
        self.ids.contains(photo_id)
    }

    pub fn insert(&mut self, photo_id: String) {
        self.ids.insert(photo_id);
    }

    /// Write the ledger back to disk.
    pub fn save(&self) -> Result<()> {
        let mut list: Vec<&String> = self.ids.iter().collect();
        list.sort();
        let text = serde_json::to_string_pretty(&list)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct StockPhotoResponse {
    id: Option<String>,
    urls: Option<StockPhotoUrls>,
}

#[derive(Debug, Deserialize)]
struct StockPhotoUrls {
    regular: Option<String>,
    full: Option<String>,
    small: Option<String>,
}

/// A picked stock photo: id for the ledger, url to download.
pub struct StockPhoto {
    pub id: String,
    pub url: String,
}

/// Stock photo API client.
#[derive(Debug)]
pub struct StockClient {
    client: Client,
    access_key: String,
    query: String,
}

impl StockClient {
    pub fn new(access_key: String, query: String) -> Result<Self> {
        if access_key.is_empty() {
            return Err(LabpubsError::Config(
                "Stock photo access key is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            access_key,
            query,
        })
    }

    /// Pick a random landscape photo whose id is not in the ledger yet.
    ///
    /// The API may keep serving the same image; retry a few times before
    /// giving up.
    pub async fn pick_unused(&self, used: &UsedLedger) -> Result<StockPhoto> {
        let url = self.build_url()?;

        for attempt in 1..=MAX_PICK_TRIES {
            let response = self.client.get(url.as_str()).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LabpubsError::Load(format!(
                    "Stock photo API error: {}",
                    status
                )));
            }

            let photo: StockPhotoResponse = response.json().await.map_err(|e| {
                LabpubsError::Parse(format!("Failed to parse stock photo response: {}", e))
            })?;

            let id = photo.id.unwrap_or_default();
            let image_url = photo
                .urls
                .map(|u| {
                    u.regular
                        .or(u.full)
                        .or(u.small)
                        .unwrap_or_default()
                })
                .unwrap_or_default();

            if id.is_empty() || image_url.is_empty() {
                warn!(attempt, "Stock photo response missing id or urls, retrying");
                continue;
            }

            if used.contains(&id) {
                debug!(photo_id = %id, attempt, "Photo already used, retrying");
                continue;
            }

            return Ok(StockPhoto { id, url: image_url });
        }

        Err(LabpubsError::Load(format!(
            "No unused stock photo after {} attempts",
            MAX_PICK_TRIES
        )))
    }

    fn build_url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(STOCK_API_URL)
            .map_err(|e| LabpubsError::Config(format!("Invalid stock API URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("query", &self.query)
            .append_pair("orientation", "landscape")
            .append_pair("content_filter", "high")
            .append_pair("client_id", &self.access_key);

        Ok(url)
    }

    /// Download one image to the destination path.
    pub async fn download(&self, image_url: &str, dest: &Path) -> Result<()> {
        let response = self.client.get(image_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LabpubsError::Load(format!(
                "Failed to download image: {}",
                status
            )));
        }

        let bytes = response.bytes().await?;
        std::fs::write(dest, &bytes)?;
        Ok(())
    }
}

/// Outcome counters for one maintenance run.
#[derive(Debug, Default)]
pub struct ThumbReport {
    pub existing: usize,
    pub created: usize,
    pub failed: usize,
}

/// Ensure every DOI has a thumbnail file, downloading stock photos for the
/// missing ones. Per-DOI failures are logged and counted, not propagated.
pub async fn update_thumbnails(
    dois: &[String],
    thumbs_dir: &Path,
    stock: &StockClient,
) -> Result<ThumbReport> {
    std::fs::create_dir_all(thumbs_dir)?;

    let mut ledger = UsedLedger::load(thumbs_dir);
    let mut report = ThumbReport::default();

    for doi in dois {
        let file_path = thumbs_dir.join(thumb_file_name(doi));

        if file_path.exists() {
            debug!(doi = %doi, "Thumbnail exists");
            report.existing += 1;
            continue;
        }

        info!(doi = %doi, "Creating thumbnail");
        match stock.pick_unused(&ledger).await {
            Ok(photo) => match stock.download(&photo.url, &file_path).await {
                Ok(()) => {
                    ledger.insert(photo.id);
                    report.created += 1;
                }
                Err(e) => {
                    warn!(doi = %doi, error = %e, "Thumbnail download failed");
                    report.failed += 1;
                }
            },
            Err(e) => {
                warn!(doi = %doi, error = %e, "Could not pick a stock photo");
                report.failed += 1;
            }
        }
    }

    ledger.save()?;

    info!(
        existing = report.existing,
        created = report.created,
        failed = report.failed,
        "Thumbnail maintenance complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_distinct_dois_normalizes_and_dedupes() {
        let works = vec![
            RawWork {
                doi: Some("https://doi.org/10.1/ABC".to_string()),
                ..Default::default()
            },
            RawWork {
                doi: Some("doi:10.1/abc".to_string()),
                ..Default::default()
            },
            RawWork {
                doi: Some("10.2/xyz".to_string()),
                ..Default::default()
            },
            RawWork::default(),
        ];

        assert_eq!(distinct_dois(&works), vec!["10.1/abc", "10.2/xyz"]);
    }

    #[test]
    fn test_thumb_file_name() {
        assert_eq!(thumb_file_name("10.1/abc"), "10_1_abc.jpg");
    }

    #[test]
    fn test_ledger_roundtrip() {
        let dir = TempDir::new().unwrap();

        let mut ledger = UsedLedger::load(dir.path());
        assert!(!ledger.contains("photo-1"));

        ledger.insert("photo-1".to_string());
        ledger.save().unwrap();

        let reloaded = UsedLedger::load(dir.path());
        assert!(reloaded.contains("photo-1"));
    }

    #[test]
    fn test_ledger_tolerates_garbage() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(USED_LEDGER_FILE), "{broken").unwrap();

        let ledger = UsedLedger::load(dir.path());
        assert!(!ledger.contains("anything"));
    }

    #[test]
    fn test_stock_client_requires_key() {
        let err = StockClient::new(String::new(), DEFAULT_STOCK_QUERY.to_string()).unwrap_err();
        assert!(matches!(err, LabpubsError::Config(_)));
    }
}
