use crate::queue::{ItemId, NotificationEvent, QueueItem, SubmissionReport};
use std::path::PathBuf;

/// Commands sent from a front end to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    /// Raw text, one URL per line
    SubmitBatch(String),
    DispatchOne(ItemId),
    DispatchAll,
    Remove(ItemId),
    ClearFinished,
    SaveArtifact(ItemId),
    Snapshot,
    // System
    Shutdown,
}

/// Events sent from the backend to a front end
#[derive(Debug, Clone)]
pub enum BackendEvent {
    Submitted(SubmissionReport),
    Dispatched(Vec<ItemId>),
    DispatchRejected { id: ItemId, reason: String },

    /// Lifecycle notification from the queue
    Notification(NotificationEvent),
    Snapshot(Vec<QueueItem>),

    ArtifactSaved { id: ItemId, path: PathBuf },

    /// No item is pending or in flight after a dispatch
    Settled,

    // System
    Error(String),
}
