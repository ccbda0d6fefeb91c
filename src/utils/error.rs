//! Error handling for Reelloader

use crate::queue::{ItemId, ItemStatus};
use thiserror::Error;

/// Main error type for Reelloader
#[derive(Debug, Error)]
pub enum ReelloaderError {
    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Failed to resolve media: {0}")]
    ResolutionError(String),

    #[error("Resolver returned an unusable result: {0}")]
    UnusableResult(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Reasons a dispatch request is refused. Neither is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("item {id} is not pending (currently {status})")]
    NotPending { id: ItemId, status: ItemStatus },

    #[error("item {0} no longer exists")]
    StaleReference(ItemId),
}
