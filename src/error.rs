//! Error types for loading transcripts and inlining assets.

use thiserror::Error;

/// Shown when the viewer link has no `id` parameter
pub const MISSING_ID_NOTICE: &str = "No transcript ID provided";
/// Shown for every other load failure; the detail only goes to the log
pub const LOAD_FAILED_NOTICE: &str =
    "Failed to load transcript. Please check the link and try again.";

/// Terminal failures for a single view of a transcript.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no transcript id in viewer link")]
    MissingIdentifier,
    #[error("storage responded with HTTP {status}")]
    Status { status: u16 },
    #[error("invalid storage host {0}")]
    InvalidHost(String),
    #[error("request to storage failed: {0}")]
    Transport(String),
    #[error("invalid transcript document: {0}")]
    Decode(String),
}

impl LoadError {
    /// The only text a viewer ever sees for this error.
    pub fn notice(&self) -> &'static str {
        match self {
            LoadError::MissingIdentifier => MISSING_ID_NOTICE,
            _ => LOAD_FAILED_NOTICE,
        }
    }
}

/// Failure to fetch or encode one asset. Always recovered by the inliner.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("request for {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("reading {url} failed: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}
