//! Resolution worker: carries one in-flight item to a terminal state

use crate::queue::events::{deliver, NotificationEvent, NotificationSink};
use crate::queue::item::{ItemId, ItemState};
use crate::queue::store::{QueueStore, TransitionOutcome};
use crate::resolver::{Artifact, Resolver};
use crate::utils::error::ReelloaderError;
use crate::utils::filename::preview_url;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Characters of the URL shown in failure notifications
const URL_PREVIEW_CHARS: usize = 30;

pub struct ResolutionWorker {
    store: Arc<QueueStore>,
    resolver: Arc<dyn Resolver>,
    sink: Arc<dyn NotificationSink>,
}

impl ResolutionWorker {
    pub fn new(
        store: Arc<QueueStore>,
        resolver: Arc<dyn Resolver>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            resolver,
            sink,
        }
    }

    /// Resolve one item that the dispatcher has already moved to `InFlight`.
    pub async fn run(&self, id: ItemId) {
        // Read the URL now, from the live store; the item may have been
        // removed between promotion and this task starting.
        let Some(url) = self.store.in_flight_url(id).await else {
            debug!("Item {} is no longer in flight, nothing to resolve", id);
            return;
        };

        let result = if self.store.validator().is_valid(&url) {
            self.resolve(&url).await
        } else {
            Err(ReelloaderError::InvalidUrl(url.clone()).to_string())
        };

        match result {
            Ok(artifact) => {
                let filename = artifact.suggested_filename.clone();
                match self.store.transition(id, ItemState::Ready(artifact)).await {
                    TransitionOutcome::Applied => {
                        info!("Item {} ready: {}", id, filename);
                        deliver(
                            self.sink.as_ref(),
                            NotificationEvent::ItemReady { id, filename },
                        )
                        .await;
                    }
                    outcome => debug!("Discarding result for item {}: {:?}", id, outcome),
                }
            }
            Err(reason) => {
                match self
                    .store
                    .transition(id, ItemState::Failed(reason.clone()))
                    .await
                {
                    TransitionOutcome::Applied => {
                        warn!("Item {} failed: {}", id, reason);
                        deliver(
                            self.sink.as_ref(),
                            NotificationEvent::ItemFailed {
                                id,
                                url_preview: preview_url(&url, URL_PREVIEW_CHARS),
                                reason,
                            },
                        )
                        .await;
                    }
                    outcome => debug!("Discarding failure for item {}: {:?}", id, outcome),
                }
            }
        }
    }

    /// Call the resolver and turn every kind of failure into a reason string
    async fn resolve(&self, url: &str) -> Result<Artifact, String> {
        match self.resolver.resolve(url).await {
            Ok(artifact) if artifact.is_usable() => Ok(artifact),
            Ok(artifact) => {
                error!(
                    "Resolver {} returned an unusable artifact for {}: {:?}",
                    self.resolver.id(),
                    url,
                    artifact
                );
                Err(ReelloaderError::UnusableResult("empty download link".to_string()).to_string())
            }
            Err(e) => {
                let reason = e.to_string();
                if reason.trim().is_empty() {
                    Err("Unknown resolver error".to_string())
                } else {
                    Err(reason)
                }
            }
        }
    }
}
