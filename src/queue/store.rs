//! Queue store: the single source of truth for queue contents
//!
//! Every read and write goes through one lock and completes without awaiting
//! anything else while holding it, so no caller observes a half-applied
//! change. Workers re-check an item against the live store at the moment
//! they apply a result; a removed item simply is not there any more.

use crate::queue::item::{
    ItemId, ItemState, ItemStatus, QueueItem, QueueSummary, Rejection, RejectionReason,
    SubmissionReport,
};
use crate::utils::error::DispatchError;
use crate::utils::validate::UrlValidator;
use std::collections::HashMap;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Result of applying one state-machine edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The item was removed before the transition arrived
    Stale,
    /// The edge does not exist from the item's current status
    Illegal { from: ItemStatus, to: ItemStatus },
}

#[derive(Debug, Default)]
struct StoreInner {
    order: Vec<ItemId>,
    items: HashMap<ItemId, QueueItem>,
    /// URL -> item currently holding it (Pending, InFlight or Ready)
    live_urls: HashMap<String, ItemId>,
}

impl StoreInner {
    fn remove(&mut self, id: ItemId) -> Option<QueueItem> {
        let item = self.items.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        if self.live_urls.get(item.url()) == Some(&id) {
            self.live_urls.remove(item.url());
        }
        Some(item)
    }
}

/// Shared, ordered store of queue items
pub struct QueueStore {
    inner: Mutex<StoreInner>,
    validator: UrlValidator,
    revision: watch::Sender<u64>,
}

impl QueueStore {
    pub fn new(validator: UrlValidator) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Mutex::new(StoreInner::default()),
            validator,
            revision,
        }
    }

    pub fn validator(&self) -> &UrlValidator {
        &self.validator
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Receiver that changes whenever the queue is mutated
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Split raw input into lines and enqueue every valid, not-yet-live URL.
    ///
    /// Never fails: invalid and duplicate lines are reported, not raised.
    pub async fn submit_batch(&self, raw_text: &str) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        let mut inner = self.inner.lock().await;

        for url in raw_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !self.validator.is_valid(url) {
                debug!("Rejected {} (invalid format)", url);
                report.rejected.push(Rejection {
                    url: url.to_string(),
                    reason: RejectionReason::InvalidFormat,
                });
                continue;
            }

            if inner.live_urls.contains_key(url) {
                debug!("Rejected {} (duplicate)", url);
                report.rejected.push(Rejection {
                    url: url.to_string(),
                    reason: RejectionReason::Duplicate,
                });
                continue;
            }

            let item = QueueItem::new(url.to_string());
            let id = item.id();
            inner.live_urls.insert(url.to_string(), id);
            inner.order.push(id);
            inner.items.insert(id, item);
            report.accepted.push(id);
        }
        drop(inner);

        if !report.accepted.is_empty() {
            self.bump();
        }
        info!(
            "Batch submitted: {} accepted, {} rejected",
            report.accepted_count(),
            report.rejected_count()
        );
        report
    }

    /// Append an item without validating or deduplicating its URL
    #[cfg(test)]
    pub(crate) async fn insert_unchecked(&self, url: &str) -> ItemId {
        let item = QueueItem::new(url.to_string());
        let id = item.id();
        let mut inner = self.inner.lock().await;
        inner.order.push(id);
        inner.items.insert(id, item);
        id
    }

    /// Delete an item whatever its status. Returns `false` for unknown ids.
    pub async fn remove(&self, id: ItemId) -> bool {
        let removed = self.inner.lock().await.remove(id);
        match removed {
            Some(item) => {
                if item.status() == ItemStatus::InFlight {
                    debug!("Removed in-flight item {}; its result will be discarded", id);
                } else {
                    debug!("Removed item {}", id);
                }
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Remove every `Ready` and `Failed` item. Returns how many were removed.
    pub async fn clear_finished(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let finished: Vec<ItemId> = inner
            .order
            .iter()
            .filter(|id| inner.items.get(*id).is_some_and(|i| i.status().is_terminal()))
            .copied()
            .collect();
        for id in &finished {
            inner.remove(*id);
        }
        drop(inner);

        if !finished.is_empty() {
            self.bump();
            info!("Cleared {} finished items", finished.len());
        }
        finished.len()
    }

    /// Insertion-ordered copy of the queue
    pub async fn snapshot(&self) -> Vec<QueueItem> {
        let inner = self.inner.lock().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.items.get(id).cloned())
            .collect()
    }

    pub async fn get(&self, id: ItemId) -> Option<QueueItem> {
        self.inner.lock().await.items.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Ids of items pending right now, in queue order
    pub async fn pending_ids(&self) -> Vec<ItemId> {
        let inner = self.inner.lock().await;
        inner
            .order
            .iter()
            .filter(|id| {
                inner
                    .items
                    .get(*id)
                    .is_some_and(|i| i.status() == ItemStatus::Pending)
            })
            .copied()
            .collect()
    }

    pub async fn summary(&self) -> QueueSummary {
        let inner = self.inner.lock().await;
        let mut summary = QueueSummary::default();
        for item in inner.items.values() {
            match item.status() {
                ItemStatus::Pending => summary.pending += 1,
                ItemStatus::InFlight => summary.in_flight += 1,
                ItemStatus::Ready => summary.ready += 1,
                ItemStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }

    /// Atomically move a pending item to `InFlight`.
    ///
    /// This is the only way into `InFlight`; two racing callers for the same
    /// id cannot both succeed.
    pub(crate) async fn promote(&self, id: ItemId) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().await;
        let item = inner
            .items
            .get_mut(&id)
            .ok_or(DispatchError::StaleReference(id))?;

        let status = item.status();
        if status != ItemStatus::Pending {
            return Err(DispatchError::NotPending { id, status });
        }
        item.set_state(ItemState::InFlight);
        drop(inner);

        self.bump();
        Ok(())
    }

    /// URL of an item that is currently in flight, read from the live store
    pub(crate) async fn in_flight_url(&self, id: ItemId) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .items
            .get(&id)
            .filter(|item| item.status() == ItemStatus::InFlight)
            .map(|item| item.url().to_string())
    }

    /// Apply one state-machine edge to a live item.
    ///
    /// Removed ids yield `Stale` and illegal edges yield `Illegal`; neither
    /// changes the store.
    pub(crate) async fn transition(&self, id: ItemId, next: ItemState) -> TransitionOutcome {
        let mut inner = self.inner.lock().await;
        let Some(item) = inner.items.get_mut(&id) else {
            debug!("Transition to {} for removed item {} ignored", next.status(), id);
            return TransitionOutcome::Stale;
        };

        let from = item.status();
        let to = next.status();
        if !from.can_transition_to(to) {
            warn!("Illegal transition {} -> {} for item {}", from, to, id);
            return TransitionOutcome::Illegal { from, to };
        }

        item.set_state(next);
        if !to.holds_url() {
            let url = item.url().to_string();
            if inner.live_urls.get(&url) == Some(&id) {
                inner.live_urls.remove(&url);
            }
        }
        drop(inner);

        debug!("Item {} {} -> {}", id, from, to);
        self.bump();
        TransitionOutcome::Applied
    }

    /// Wait until every listed item is terminal or gone.
    pub async fn wait_settled(&self, ids: &[ItemId]) {
        let mut rx = self.subscribe();
        loop {
            rx.borrow_and_update();
            if self.all_settled(ids).await {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn all_settled(&self, ids: &[ItemId]) -> bool {
        let inner = self.inner.lock().await;
        ids.iter().all(|id| {
            inner
                .items
                .get(id)
                .map_or(true, |item| item.status().is_terminal())
        })
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new(UrlValidator::default())
    }
}
