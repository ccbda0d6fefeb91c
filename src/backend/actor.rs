use super::messages::{BackendCommand, BackendEvent};
use crate::downloader::{ArtifactFetcher, FetchConfig};
use crate::queue::events::deliver;
use crate::queue::{
    ChannelSink, Dispatcher, EventJournal, FanoutSink, ItemId, NotificationEvent,
    NotificationSink, QueueStore, ResolutionWorker, TracingSink,
};
use crate::resolver::Resolver;
use crate::utils::config::AppSettings;
use crate::utils::platform;
use crate::utils::validate::UrlValidator;
use anyhow::Result;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,
    sender: mpsc::Sender<BackendEvent>,

    // Components
    store: Arc<QueueStore>,
    dispatcher: Dispatcher,
    fetcher: ArtifactFetcher,
    sink: Arc<dyn NotificationSink>,

    notifications: mpsc::UnboundedReceiver<NotificationEvent>,
    settled_tx: mpsc::UnboundedSender<()>,
    settled_rx: mpsc::UnboundedReceiver<()>,
}

impl BackendActor {
    /// Wire the queue, dispatcher and fetcher around `resolver`.
    ///
    /// Must be called inside a Tokio runtime when a concurrency limit is set.
    pub async fn new(
        settings: AppSettings,
        resolver: Arc<dyn Resolver>,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::Sender<BackendEvent>,
    ) -> Result<Self> {
        let store = Arc::new(QueueStore::new(UrlValidator::new(
            settings.allowed_hosts.clone(),
        )));

        // 1. Notification sinks: log lines, the actor's own event stream, optional journal
        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let mut fanout = FanoutSink::new(vec![
            Arc::new(TracingSink) as Arc<dyn NotificationSink>,
            Arc::new(ChannelSink::new(notify_tx)),
        ]);
        if settings.journal {
            let journal = EventJournal::new(&platform::journal_path()).await?;
            info!("Journaling notifications to {:?}", journal.path());
            fanout.push(Arc::new(journal));
        }
        let sink: Arc<dyn NotificationSink> = Arc::new(fanout);

        // 2. Worker and dispatcher
        let worker = Arc::new(ResolutionWorker::new(
            Arc::clone(&store),
            resolver,
            Arc::clone(&sink),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&store), worker, settings.max_concurrent);

        // 3. Artifact retrieval; large files must not hit a whole-request timeout
        let client = Client::builder()
            .connect_timeout(settings.request_timeout())
            .build()?;
        let fetcher = ArtifactFetcher::new(
            client,
            settings.download_location.clone(),
            FetchConfig {
                retry_attempts: settings.retry_attempts,
                ..Default::default()
            },
        );

        let (settled_tx, settled_rx) = mpsc::unbounded_channel();

        Ok(Self {
            receiver,
            sender,
            store,
            dispatcher,
            fetcher,
            sink,
            notifications,
            settled_tx,
            settled_rx,
        })
    }

    /// Shared handle to the queue, for read-only observers
    pub fn store(&self) -> Arc<QueueStore> {
        Arc::clone(&self.store)
    }

    pub async fn run(mut self) {
        info!("BackendActor started");

        loop {
            tokio::select! {
                biased;

                Some(event) = self.notifications.recv() => {
                    let _ = self.sender.send(BackendEvent::Notification(event)).await;
                }
                Some(()) = self.settled_rx.recv() => {
                    if self.store.summary().await.is_settled() {
                        let _ = self.sender.send(BackendEvent::Settled).await;
                    }
                }
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        info!("Command channel closed, BackendActor stopping");
                        break;
                    };
                    if matches!(cmd, BackendCommand::Shutdown) {
                        info!("BackendActor shutting down");
                        break;
                    }
                    self.handle_command(cmd).await;
                }
            }
        }
    }

    async fn handle_command(&self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::SubmitBatch(raw) => self.handle_submit(raw).await,
            BackendCommand::DispatchOne(id) => match self.dispatcher.dispatch_one(id).await {
                Ok(()) => self.after_dispatch(vec![id]).await,
                Err(e) => {
                    debug!("Dispatch of {} refused: {}", id, e);
                    let _ = self
                        .sender
                        .send(BackendEvent::DispatchRejected {
                            id,
                            reason: e.to_string(),
                        })
                        .await;
                }
            },
            BackendCommand::DispatchAll => {
                let ids = self.dispatcher.dispatch_all_pending().await;
                self.after_dispatch(ids).await;
            }
            BackendCommand::Remove(id) => {
                if !self.store.remove(id).await {
                    debug!("Remove of unknown item {} ignored", id);
                }
                self.send_snapshot().await;
            }
            BackendCommand::ClearFinished => {
                self.store.clear_finished().await;
                self.send_snapshot().await;
            }
            BackendCommand::SaveArtifact(id) => self.handle_save(id).await,
            BackendCommand::Snapshot => self.send_snapshot().await,
            BackendCommand::Shutdown => {}
        }
    }

    async fn handle_submit(&self, raw: String) {
        if raw.lines().all(|line| line.trim().is_empty()) {
            let _ = self
                .sender
                .send(BackendEvent::Error(
                    "No URLs: paste one media URL per line".to_string(),
                ))
                .await;
            return;
        }

        let report = self.store.submit_batch(&raw).await;
        deliver(
            self.sink.as_ref(),
            NotificationEvent::BatchAccepted {
                accepted_count: report.accepted_count(),
                rejected_count: report.rejected_count(),
            },
        )
        .await;
        let _ = self.sender.send(BackendEvent::Submitted(report)).await;
    }

    async fn after_dispatch(&self, ids: Vec<ItemId>) {
        let _ = self.sender.send(BackendEvent::Dispatched(ids.clone())).await;

        // Report back through the actor loop once this wave has finished
        let store = Arc::clone(&self.store);
        let settled_tx = self.settled_tx.clone();
        tokio::spawn(async move {
            store.wait_settled(&ids).await;
            let _ = settled_tx.send(());
        });
    }

    async fn handle_save(&self, id: ItemId) {
        let artifact = match self.store.get(id).await {
            Some(item) => item.artifact().cloned(),
            None => None,
        };
        let Some(artifact) = artifact else {
            warn!("Save requested for item {} without an artifact", id);
            let _ = self
                .sender
                .send(BackendEvent::Error(format!("Item {} is not ready", id)))
                .await;
            return;
        };

        // Fire and forget; the outcome comes back as an event
        let fetcher = self.fetcher.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let event = match fetcher.save(&artifact).await {
                Ok(path) => BackendEvent::ArtifactSaved { id, path },
                Err(e) => BackendEvent::Error(format!(
                    "Saving {} failed: {}",
                    artifact.suggested_filename, e
                )),
            };
            let _ = sender.send(event).await;
        });
    }

    async fn send_snapshot(&self) {
        let items = self.store.snapshot().await;
        let _ = self.sender.send(BackendEvent::Snapshot(items)).await;
    }
}
