//! Platform-specific paths for Reelloader
//!
//! - Configuration: `~/.config/reelloader` on Linux, the platform config dir elsewhere
//! - Downloads: `~/Downloads/Reelloader`

use std::path::PathBuf;
use tracing::warn;

/// Returns the configuration directory
/// - macOS: ~/Library/Application Support/Reelloader
/// - Windows: %APPDATA%\Reelloader
/// - Linux: ~/.config/reelloader
pub fn config_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));

    #[cfg(target_os = "linux")]
    {
        base.join("reelloader")
    }

    #[cfg(not(target_os = "linux"))]
    {
        base.join("Reelloader")
    }
}

/// Default location of the settings file
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Default location of the notification journal
pub fn journal_path() -> PathBuf {
    config_dir().join("events.jsonl")
}

/// Returns the default download directory
/// - All platforms: ~/Downloads/Reelloader
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| {
            warn!("Could not determine Downloads directory, using ./downloads");
            PathBuf::from("./downloads")
        })
        .join("Reelloader")
}
