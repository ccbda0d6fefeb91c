use crate::resolver::models::Artifact;
use anyhow::Result;
use async_trait::async_trait;

/// Core trait for all media resolvers
///
/// This trait isolates the queue from the specific resolution method
/// (hosted API, yt-dlp, test doubles).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns a unique identifier for this resolver (e.g., "direct-api", "ytdlp")
    fn id(&self) -> &'static str;

    /// Checks if this resolver can handle the given URL
    fn supports(&self, url: &str) -> bool;

    /// Resolves a page URL to a downloadable artifact
    async fn resolve(&self, url: &str) -> Result<Artifact>;
}
