//! Dispatcher: decides which pending items start resolving
//!
//! Unbounded mode promotes every selected item immediately and spawns one
//! task per item. Bounded mode runs a fixed pool of worker tasks pulling ids
//! from a channel; an item stays `Pending` until a pool worker picks it up
//! and promotes it, so the limit holds across dispatch calls. An id sits in
//! the channel at most once; repeated dispatches of a still-queued item are
//! no-ops.

use crate::queue::item::{ItemId, ItemStatus};
use crate::queue::store::QueueStore;
use crate::queue::worker::ResolutionWorker;
use crate::utils::error::DispatchError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct WorkerPool {
    sender: mpsc::UnboundedSender<ItemId>,
    // Ids sent but not yet picked up by a pool worker
    queued: Arc<Mutex<HashSet<ItemId>>>,
    size: usize,
    // Workers exit on their own once the sender is dropped
    _handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn spawn(size: usize, store: Arc<QueueStore>, worker: Arc<ResolutionWorker>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<ItemId>();
        let receiver = Arc::new(Mutex::new(receiver));
        let queued = Arc::new(Mutex::new(HashSet::new()));

        let handles = (0..size)
            .map(|slot| {
                let receiver = Arc::clone(&receiver);
                let queued = Arc::clone(&queued);
                let store = Arc::clone(&store);
                let worker = Arc::clone(&worker);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(id) = next else {
                            debug!("Pool worker {} shutting down", slot);
                            break;
                        };
                        queued.lock().await.remove(&id);
                        match store.promote(id).await {
                            Ok(()) => worker.run(id).await,
                            // Removed, or promoted by someone else since it was queued
                            Err(e) => debug!("Pool worker {} skipped item: {}", slot, e),
                        }
                    }
                })
            })
            .collect();

        Self {
            sender,
            queued,
            size,
            _handles: handles,
        }
    }

    /// Queue `id` for a pool worker. Returns false if it was already queued
    /// or the pool is gone.
    async fn enqueue(&self, id: ItemId) -> bool {
        let mut queued = self.queued.lock().await;
        if !queued.insert(id) {
            return false;
        }
        if self.sender.send(id).is_err() {
            // Only possible if every pool worker panicked
            warn!("Dispatcher pool is gone; item {} stays pending", id);
            queued.remove(&id);
            return false;
        }
        true
    }

    #[cfg(test)]
    async fn queued_len(&self) -> usize {
        self.queued.lock().await.len()
    }
}

pub struct Dispatcher {
    store: Arc<QueueStore>,
    worker: Arc<ResolutionWorker>,
    pool: Option<WorkerPool>,
}

impl Dispatcher {
    /// Create a dispatcher. `max_concurrent = None` resolves everything at once.
    ///
    /// A bounded dispatcher spawns its pool here, so it must be created inside
    /// a Tokio runtime.
    pub fn new(
        store: Arc<QueueStore>,
        worker: Arc<ResolutionWorker>,
        max_concurrent: Option<usize>,
    ) -> Self {
        let pool = max_concurrent.map(|limit| {
            let size = limit.max(1);
            info!("Starting dispatcher pool with {} workers", size);
            WorkerPool::spawn(size, Arc::clone(&store), Arc::clone(&worker))
        });

        Self {
            store,
            worker,
            pool,
        }
    }

    /// Concurrency limit, `None` when unbounded
    pub fn max_concurrent(&self) -> Option<usize> {
        self.pool.as_ref().map(|p| p.size)
    }

    /// Start resolving exactly one named item.
    pub async fn dispatch_one(&self, id: ItemId) -> Result<(), DispatchError> {
        match &self.pool {
            None => {
                self.store.promote(id).await?;
                self.spawn_worker(id);
            }
            Some(pool) => {
                let item = self
                    .store
                    .get(id)
                    .await
                    .ok_or(DispatchError::StaleReference(id))?;
                if item.status() != ItemStatus::Pending {
                    return Err(DispatchError::NotPending {
                        id,
                        status: item.status(),
                    });
                }
                if !pool.enqueue(id).await {
                    debug!("Item {} is already queued", id);
                }
            }
        }
        debug!("Dispatched item {}", id);
        Ok(())
    }

    /// Start resolving every item pending at call time.
    ///
    /// Returns the ids that were newly scheduled; in bounded mode, ids still
    /// waiting in the pool queue from an earlier call are skipped. Items
    /// submitted after the snapshot wait for the next call.
    pub async fn dispatch_all_pending(&self) -> Vec<ItemId> {
        let pending = self.store.pending_ids().await;
        let mut dispatched = Vec::with_capacity(pending.len());

        for id in pending {
            match &self.pool {
                None => match self.store.promote(id).await {
                    Ok(()) => {
                        self.spawn_worker(id);
                        dispatched.push(id);
                    }
                    Err(e) => debug!("Skipping item during dispatch: {}", e),
                },
                Some(pool) => {
                    if pool.enqueue(id).await {
                        dispatched.push(id);
                    }
                }
            }
        }

        info!("Dispatched {} pending items", dispatched.len());
        dispatched
    }

    fn spawn_worker(&self, id: ItemId) {
        let worker = Arc::clone(&self.worker);
        tokio::spawn(async move {
            worker.run(id).await;
        });
    }
}
