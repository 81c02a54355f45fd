//! Custom error types for labpubs.
//!
//! This module defines all error types used throughout the application.
//! All functions return `Result<T, LabpubsError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for labpubs operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum LabpubsError {
    /// A local resource (config file, ledger, thumbnail) could not be read
    #[error("Load error: {0}")]
    Load(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Decoded text is not valid structured data
    #[error("Parse error: {0}")]
    Parse(String),

    /// OpenAlex returned a non-success status for one author's request
    #[error("Upstream error for author {author}: status {status}")]
    Upstream {
        /// Roster author identifier the failed request was for
        author: String,
        /// HTTP status code returned by the API
        status: u16,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `LabpubsError`
pub type Result<T> = std::result::Result<T, LabpubsError>;
