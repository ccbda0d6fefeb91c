pub mod api;
pub mod hybrid;
pub mod models;
pub mod traits;
pub mod ytdlp;

pub use api::{http_client, DirectLinkResolver, IgdlResolver};
pub use hybrid::HybridResolver;
pub use models::{Artifact, MediaKind};
pub use traits::Resolver;
pub use ytdlp::YtDlpResolver;

use crate::utils::config::{AppSettings, ResolverKind};
use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

/// Build the resolver selected in the settings
pub fn build_resolver(settings: &AppSettings) -> Result<Arc<dyn Resolver>> {
    let timeout = settings.request_timeout();
    let client = http_client(timeout)?;

    let resolver: Arc<dyn Resolver> = match settings.resolver {
        ResolverKind::Direct => Arc::new(DirectLinkResolver::new(
            client,
            settings.direct_api_endpoint.clone(),
        )),
        ResolverKind::Igdl => Arc::new(IgdlResolver::new(
            client,
            settings.igdl_api_endpoint.clone(),
        )),
        ResolverKind::Ytdlp => Arc::new(YtDlpResolver::new(timeout)?),
        ResolverKind::Hybrid => {
            let direct: Arc<dyn Resolver> = Arc::new(DirectLinkResolver::new(
                client.clone(),
                settings.direct_api_endpoint.clone(),
            ));
            // yt-dlp is optional here; without it the second API is the fallback
            let fallback: Arc<dyn Resolver> = match YtDlpResolver::new(timeout) {
                Ok(ytdlp) => Arc::new(ytdlp),
                Err(e) => {
                    warn!("{}; falling back to the igdl API instead", e);
                    Arc::new(IgdlResolver::new(client, settings.igdl_api_endpoint.clone()))
                }
            };
            Arc::new(HybridResolver::new(vec![direct], fallback))
        }
    };

    Ok(resolver)
}
