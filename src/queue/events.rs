use crate::queue::item::ItemId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// User-facing lifecycle events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A batch was submitted
    BatchAccepted {
        accepted_count: usize,
        rejected_count: usize,
    },
    /// An item resolved to a downloadable artifact
    ItemReady { id: ItemId, filename: String },
    /// An item failed to resolve
    ItemFailed {
        id: ItemId,
        url_preview: String,
        reason: String,
    },
}

/// Receiver of lifecycle events. Errors are logged and otherwise ignored.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<()>;
}

/// Deliver an event, swallowing sink failures
pub async fn deliver(sink: &dyn NotificationSink, event: NotificationEvent) {
    if let Err(e) = sink.notify(&event).await {
        warn!("Notification sink failed for {:?}: {}", event, e);
    }
}

/// Sink that writes events as log lines
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        match event {
            NotificationEvent::BatchAccepted {
                accepted_count,
                rejected_count,
            } => info!(
                accepted = accepted_count,
                rejected = rejected_count,
                "URLs added to queue"
            ),
            NotificationEvent::ItemReady { id, filename } => {
                info!(%id, filename = %filename, "Media ready")
            }
            NotificationEvent::ItemFailed {
                id,
                url_preview,
                reason,
            } => warn!(%id, url = %url_preview, reason = %reason, "Fetch failed"),
        }
        Ok(())
    }
}

/// Sink that forwards events into a channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<NotificationEvent>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| anyhow::anyhow!("notification receiver closed"))
    }
}

/// Sink that delivers to several sinks; one failing does not stop the others
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        for sink in &self.sinks {
            deliver(sink.as_ref(), event.clone()).await;
        }
        Ok(())
    }
}

/// One journal line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: NotificationEvent,
}

/// Append-only JSON lines journal of notifications
///
/// This is an audit trail for the user; the queue is never rebuilt from it.
#[derive(Debug, Clone)]
pub struct EventJournal {
    file_path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl EventJournal {
    pub async fn new(file_path: &Path) -> Result<Self> {
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .await
            .context("Failed to open event journal")?;

        Ok(Self {
            file_path: file_path.to_path_buf(),
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Read every entry back, skipping lines that fail to parse
    #[cfg(test)]
    async fn read_entries(&self) -> Result<Vec<JournalEntry>> {
        let content = tokio::fs::read_to_string(&self.file_path).await?;
        let mut entries = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Failed to parse journal line: {}. Error: {}", line, e),
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl NotificationSink for EventJournal {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        let entry = JournalEntry {
            timestamp: Utc::now(),
            event: event.clone(),
        };
        let json = serde_json::to_string(&entry)?;

        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}
