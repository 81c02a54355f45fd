//! # labpubs
//!
//! Publications pipeline for the lab website: fetches works from OpenAlex
//! for every roster author, deduplicates them by title, applies manual
//! edits, and exposes the sorted collection to filtering and grouping.
//!
//! ## Modules
//!
//! - [`jsonc`] - JSONC config loading (comment stripping + strict parse)
//! - [`config`] - Author roster and edit-directive files
//! - [`openalex`] - OpenAlex works API client
//! - [`normalize`] - Raw work normalization
//! - [`dedup`] - Title-keyed deduplication
//! - [`edits`] - Manual remove/add overlay
//! - [`query`] - Filtering, sorting and year grouping
//! - [`pipeline`] - The full load cycle
//! - [`thumbs`] - Thumbnail maintenance
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use labpubs::{config, openalex::WorksClient, pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let roster = config::load_roster("openalex-authors.jsonc".as_ref())?;
//!     let client = WorksClient::new()?;
//!     let publications = pipeline::load_publications(&client, &roster, &[]).await?;
//!     println!("Loaded {} publications", publications.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dedup;
pub mod edits;
pub mod error;
pub mod jsonc;
pub mod normalize;
pub mod openalex;
pub mod pipeline;
pub mod query;
pub mod thumbs;

pub use error::{LabpubsError, Result};
