//! Data structures for resolved media

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of media behind a resolved link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Guess the kind from a service-provided type string or file extension.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "video" | "mp4" | "mov" | "webm" | "m4v" | "mkv" => Some(MediaKind::Video),
            "image" | "photo" | "jpg" | "jpeg" | "png" | "webp" | "heic" => {
                Some(MediaKind::Image)
            }
            _ => None,
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// The downloadable reference produced by a resolver for one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub target_url: String,
    pub suggested_filename: String,
    pub media_kind: MediaKind,
}

impl Artifact {
    /// Filename used when the service does not suggest one,
    /// e.g. `instagram_video_C0abc.mp4`.
    pub fn fallback_filename(page_url: &str, kind: MediaKind) -> String {
        let code = crate::utils::validate::shortcode(page_url)
            .unwrap_or_else(|| "media".to_string());
        format!("instagram_{}_{}.{}", kind, code, kind.default_extension())
    }

    /// An artifact is usable when it points somewhere and can be saved under a name.
    pub fn is_usable(&self) -> bool {
        !self.target_url.trim().is_empty() && !self.suggested_filename.trim().is_empty()
    }
}

/// Response of the single-link download API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectLinkResponse {
    #[serde(default)]
    pub success: bool,
    pub download_url: Option<String>,
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub message: Option<String>,
}

/// Response of the list-shaped download API
#[derive(Debug, Clone, Deserialize)]
pub struct IgdlResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Vec<IgdlMedia>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IgdlMedia {
    pub url: String,
    pub thumbnail: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

/// The subset of `yt-dlp --dump-json` output the resolver reads
#[derive(Debug, Clone, Deserialize)]
pub struct YtDlpInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
}
