//! yt-dlp backed resolver
//!
//! Runs `yt-dlp --dump-json` against the page URL and turns the reported
//! direct media URL into an artifact. Used as the fallback when the hosted
//! APIs cannot resolve a link.

use crate::resolver::models::{Artifact, MediaKind, YtDlpInfo};
use crate::resolver::traits::Resolver;
use crate::utils::error::ReelloaderError;
use crate::utils::filename::sanitize_filename;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Resolver that shells out to yt-dlp
pub struct YtDlpResolver {
    ytdlp_path: PathBuf,
    timeout: Duration,
}

impl YtDlpResolver {
    /// Locate yt-dlp and build the resolver
    ///
    /// Search order:
    /// 1. System PATH
    /// 2. Common installation paths (Homebrew, pip user installs)
    pub fn new(timeout: Duration) -> Result<Self> {
        let ytdlp_path = match find_ytdlp() {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                path
            }
            None => {
                error!("yt-dlp not found anywhere!");
                return Err(ReelloaderError::YtDlpNotFound.into());
            }
        };

        Ok(Self::with_path(ytdlp_path, timeout))
    }

    pub fn with_path(ytdlp_path: PathBuf, timeout: Duration) -> Self {
        Self {
            ytdlp_path,
            timeout,
        }
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &PathBuf {
        &self.ytdlp_path
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    fn supports(&self, _url: &str) -> bool {
        true
    }

    /// Uses: yt-dlp --dump-json --no-download
    async fn resolve(&self, url: &str) -> Result<Artifact> {
        debug!("Resolving {} with yt-dlp", url);

        let run = AsyncCommand::new(&self.ytdlp_path)
            .arg("--dump-json")
            .arg("--no-download")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg(url)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                ReelloaderError::ResolutionError(format!(
                    "yt-dlp timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp resolution failed: {}", error_msg.trim());
            return Err(ReelloaderError::ResolutionError(error_msg.trim().to_string()).into());
        }

        let json_str = String::from_utf8(output.stdout)
            .map_err(|e| ReelloaderError::UnusableResult(e.to_string()))?;
        // Multi-item posts print one object per line; take the first
        let first_line = json_str.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let info: YtDlpInfo = serde_json::from_str(first_line)?;

        artifact_from_info(info)
    }
}

fn artifact_from_info(info: YtDlpInfo) -> Result<Artifact> {
    let target_url = info
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ReelloaderError::UnusableResult("yt-dlp reported no media URL".into()))?;

    let ext = info.ext.unwrap_or_else(|| "mp4".to_string());
    let has_video = info.vcodec.as_deref().is_some_and(|v| v != "none");
    let media_kind = MediaKind::from_hint(&ext)
        .or(has_video.then_some(MediaKind::Video))
        .unwrap_or(MediaKind::Video);

    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| info.id.clone());

    Ok(Artifact {
        target_url,
        suggested_filename: sanitize_filename(&format!("{}.{}", title, ext)),
        media_kind,
    })
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. System PATH
/// 2. Common installation paths
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Ok(path) = which::which("yt-dlp") {
        debug!("Using system yt-dlp: {:?}", path);
        return Some(path);
    }

    if let Some(common) = find_in_common_paths() {
        debug!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("yt-dlp not found anywhere!");
    None
}

/// Find yt-dlp in common installation paths
fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        // macOS Homebrew (Apple Silicon)
        "/opt/homebrew/bin/yt-dlp",
        // macOS Homebrew (Intel)
        "/usr/local/bin/yt-dlp",
        // System
        "/usr/bin/yt-dlp",
        // pip user install
        "~/.local/bin/yt-dlp",
    ];

    common_paths
        .iter()
        .map(|path_str| match path_str.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(path_str)),
            None => PathBuf::from(path_str),
        })
        .find(|path| is_executable(path))
}

/// Check if a file is executable
fn is_executable(path: &PathBuf) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

// ============================================================
// Tests
// ============================================================
