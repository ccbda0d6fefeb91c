//! Queue items and their lifecycle

use crate::resolver::Artifact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier assigned at submission time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Item status, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Pending,
    InFlight,
    Ready,
    Failed,
}

impl ItemStatus {
    /// `Ready` and `Failed` have no outgoing edges
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Ready | ItemStatus::Failed)
    }

    /// Items in these states own their URL for duplicate detection
    pub fn holds_url(&self) -> bool {
        !matches!(self, ItemStatus::Failed)
    }

    /// Whether the state machine has an edge from `self` to `next`
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::InFlight)
                | (ItemStatus::InFlight, ItemStatus::Ready)
                | (ItemStatus::InFlight, ItemStatus::Failed)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Pending => "Pending",
            ItemStatus::InFlight => "InFlight",
            ItemStatus::Ready => "Ready",
            ItemStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Item state with its payload. The artifact exists only when ready and the
/// error only when failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemState {
    Pending,
    InFlight,
    Ready(Artifact),
    Failed(String),
}

impl ItemState {
    pub fn status(&self) -> ItemStatus {
        match self {
            ItemState::Pending => ItemStatus::Pending,
            ItemState::InFlight => ItemStatus::InFlight,
            ItemState::Ready(_) => ItemStatus::Ready,
            ItemState::Failed(_) => ItemStatus::Failed,
        }
    }
}

/// One submitted URL and its progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    id: ItemId,
    url: String,
    state: ItemState,
    added_at: DateTime<Utc>,
}

impl QueueItem {
    pub(crate) fn new(url: String) -> Self {
        Self {
            id: ItemId::new(),
            url,
            state: ItemState::Pending,
            added_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    pub fn status(&self) -> ItemStatus {
        self.state.status()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.state {
            ItemState::Ready(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ItemState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// Replace the state. Callers check the edge first.
    pub(crate) fn set_state(&mut self, state: ItemState) {
        self.state = state;
    }
}

/// Why a submitted line did not become a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    InvalidFormat,
    Duplicate,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::InvalidFormat => "invalid-format",
            RejectionReason::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub url: String,
    pub reason: RejectionReason,
}

/// Outcome of one `submit_batch` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub accepted: Vec<ItemId>,
    pub rejected: Vec<Rejection>,
}

impl SubmissionReport {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn rejected_for(&self, reason: RejectionReason) -> usize {
        self.rejected.iter().filter(|r| r.reason == reason).count()
    }
}

/// Per-status item counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub pending: usize,
    pub in_flight: usize,
    pub ready: usize,
    pub failed: usize,
}

impl QueueSummary {
    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.ready + self.failed
    }

    /// No item is waiting for or undergoing resolution
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.in_flight == 0
    }
}
