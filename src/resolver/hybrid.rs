use crate::resolver::models::Artifact;
use crate::resolver::traits::Resolver;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// The Hybrid Resolver Registry
///
/// Holds a list of resolvers and routes each URL to the first one whose
/// `supports(url)` matches. If that resolver fails, the fallback gets one try.
pub struct HybridResolver {
    resolvers: Vec<Arc<dyn Resolver>>,
    fallback: Arc<dyn Resolver>,
}

impl HybridResolver {
    /// Create a new HybridResolver with the given registry and fallback
    pub fn new(resolvers: Vec<Arc<dyn Resolver>>, fallback: Arc<dyn Resolver>) -> Self {
        Self {
            resolvers,
            fallback,
        }
    }

    /// Find the best resolver for a given URL
    fn find_resolver(&self, url: &str) -> &Arc<dyn Resolver> {
        for resolver in &self.resolvers {
            if resolver.supports(url) {
                debug!("Routing to resolver: {}", resolver.id());
                return resolver;
            }
        }
        debug!("Routing to fallback resolver: {}", self.fallback.id());
        &self.fallback
    }
}

#[async_trait]
impl Resolver for HybridResolver {
    fn id(&self) -> &'static str {
        "hybrid"
    }

    fn supports(&self, url: &str) -> bool {
        self.resolvers.iter().any(|r| r.supports(url)) || self.fallback.supports(url)
    }

    async fn resolve(&self, url: &str) -> Result<Artifact> {
        let resolver = self.find_resolver(url);
        match resolver.resolve(url).await {
            Ok(artifact) => Ok(artifact),
            Err(e) if resolver.id() != self.fallback.id() => {
                info!(
                    "Primary resolver {} failed: {}. Retrying with fallback...",
                    resolver.id(),
                    e
                );
                self.fallback.resolve(url).await.map_err(|fallback_err| {
                    // Report the primary failure, not the fallback one
                    debug!("Fallback {} also failed: {}", self.fallback.id(), fallback_err);
                    e
                })
            }
            Err(e) => Err(e),
        }
    }
}
