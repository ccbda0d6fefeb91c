//! Application configuration

use crate::utils::error::ReelloaderError;
use crate::utils::platform;
use crate::utils::validate::DEFAULT_HOST;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Where saved artifacts are written
    pub download_location: PathBuf,

    /// Maximum concurrent resolutions; `None` dispatches everything at once
    pub max_concurrent: Option<usize>,

    /// Which resolver backs the queue
    pub resolver: ResolverKind,

    /// Single-link download API (`?url=` is appended)
    pub direct_api_endpoint: String,

    /// List-shaped download API (`?url=` is appended)
    pub igdl_api_endpoint: String,

    /// Timeout for every outbound resolver or download request
    pub request_timeout_secs: u64,

    /// Retry attempts when saving an artifact
    pub retry_attempts: usize,

    /// Hosts accepted by the URL validator
    pub allowed_hosts: Vec<String>,

    /// Append every notification to a JSON lines journal
    pub journal: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            download_location: platform::default_download_dir(),
            max_concurrent: None,
            resolver: ResolverKind::Hybrid,
            direct_api_endpoint: "https://apis.davidcyriltech.my.id/instagram".to_string(),
            igdl_api_endpoint: "https://api-aswin-sparky.koyeb.app/api/downloader/igdl"
                .to_string(),
            request_timeout_secs: 30,
            retry_attempts: 3,
            allowed_hosts: vec![DEFAULT_HOST.to_string()],
            journal: false,
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file. A missing file yields the defaults;
    /// fields absent from the file keep their default values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            ReelloaderError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        info!("Loaded settings from {:?}", path);
        Ok(settings.validated())
    }

    /// Enforce sane minimums
    pub fn validated(mut self) -> Self {
        if self.max_concurrent == Some(0) {
            self.max_concurrent = Some(1);
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = 1;
        }
        if self.allowed_hosts.is_empty() {
            self.allowed_hosts = vec![DEFAULT_HOST.to_string()];
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Resolver backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Single-link JSON API
    Direct,
    /// List-shaped JSON API
    Igdl,
    /// Local yt-dlp binary
    Ytdlp,
    /// Direct API first, yt-dlp as fallback
    Hybrid,
}

impl ResolverKind {
    /// Get string representation for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverKind::Direct => "direct",
            ResolverKind::Igdl => "igdl",
            ResolverKind::Ytdlp => "ytdlp",
            ResolverKind::Hybrid => "hybrid",
        }
    }
}
