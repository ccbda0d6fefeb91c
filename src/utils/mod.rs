//! Utility modules for error handling, configuration and URL handling

pub mod config;
pub mod error;
pub mod filename;
pub mod platform;
pub mod validate;

// Re-export for convenience
pub use config::{AppSettings, ResolverKind};
pub use error::{DispatchError, ReelloaderError};
pub use filename::{preview_url, sanitize_filename};
pub use validate::UrlValidator;
