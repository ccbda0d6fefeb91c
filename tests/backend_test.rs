//! Driving the backend actor through its command/event channels

mod common;

use common::{post_url, Route, ScriptedResolver, TEST_HOST};
use reelloader::queue::{ItemStatus, NotificationEvent};
use reelloader::resolver::{http_client, DirectLinkResolver, Resolver};
use reelloader::utils::AppSettings;
use reelloader::{BackendActor, BackendCommand, BackendEvent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct Running {
    commands: mpsc::Sender<BackendCommand>,
    events: mpsc::Receiver<BackendEvent>,
    handle: JoinHandle<()>,
    _dir: TempDir,
}

impl Running {
    async fn send(&self, cmd: BackendCommand) {
        self.commands.send(cmd).await.unwrap();
    }

    /// Next event matching `pred`, skipping everything else
    async fn wait_for<F>(&mut self, mut pred: F) -> BackendEvent
    where
        F: FnMut(&BackendEvent) -> bool,
    {
        timeout(Duration::from_secs(5), async {
            loop {
                let event = self.events.recv().await.expect("actor stopped");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("event did not arrive in time")
    }
}

async fn start(
    resolver: Arc<dyn Resolver>,
    allowed_hosts: Vec<String>,
    max_concurrent: Option<usize>,
) -> Running {
    let dir = tempdir().unwrap();
    let settings = AppSettings {
        download_location: dir.path().to_path_buf(),
        allowed_hosts,
        max_concurrent,
        retry_attempts: 0,
        ..Default::default()
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = mpsc::channel(32);
    let actor = BackendActor::new(settings, resolver, cmd_rx, event_tx)
        .await
        .unwrap();
    let handle = tokio::spawn(actor.run());

    Running {
        commands: cmd_tx,
        events: event_rx,
        handle,
        _dir: dir,
    }
}

async fn start_scripted(max_concurrent: Option<usize>) -> Running {
    start(
        Arc::new(ScriptedResolver::new()),
        vec![TEST_HOST.to_string()],
        max_concurrent,
    )
    .await
}

#[tokio::test]
async fn test_submit_dispatch_settle() {
    for limit in [None, Some(1)] {
        let mut backend = start_scripted(limit).await;
        let input = [post_url("a"), post_url("fail-b"), post_url("a"), "junk".to_string()].join("\n");

        backend.send(BackendCommand::SubmitBatch(input)).await;
        let report = match backend
            .wait_for(|e| matches!(e, BackendEvent::Submitted(_)))
            .await
        {
            BackendEvent::Submitted(report) => report,
            _ => unreachable!(),
        };
        assert_eq!(report.accepted_count(), 2);
        assert_eq!(report.rejected_count(), 2);

        backend.send(BackendCommand::DispatchAll).await;
        match backend
            .wait_for(|e| matches!(e, BackendEvent::Dispatched(_)))
            .await
        {
            BackendEvent::Dispatched(ids) => assert_eq!(ids, report.accepted),
            _ => unreachable!(),
        }
        backend
            .wait_for(|e| matches!(e, BackendEvent::Settled))
            .await;

        backend.send(BackendCommand::Snapshot).await;
        match backend
            .wait_for(|e| matches!(e, BackendEvent::Snapshot(_)))
            .await
        {
            BackendEvent::Snapshot(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].status(), ItemStatus::Ready);
                assert_eq!(items[1].status(), ItemStatus::Failed);
            }
            _ => unreachable!(),
        }

        backend.send(BackendCommand::Shutdown).await;
        timeout(Duration::from_secs(5), backend.handle)
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn test_notifications_are_forwarded() {
    let mut backend = start_scripted(None).await;
    backend
        .send(BackendCommand::SubmitBatch(post_url("n1")))
        .await;

    match backend
        .wait_for(|e| matches!(e, BackendEvent::Notification(_)))
        .await
    {
        BackendEvent::Notification(NotificationEvent::BatchAccepted {
            accepted_count,
            rejected_count,
        }) => {
            assert_eq!(accepted_count, 1);
            assert_eq!(rejected_count, 0);
        }
        other => panic!("unexpected event {:?}", other),
    }

    backend.send(BackendCommand::DispatchAll).await;
    match backend
        .wait_for(|e| {
            matches!(
                e,
                BackendEvent::Notification(NotificationEvent::ItemReady { .. })
            )
        })
        .await
    {
        BackendEvent::Notification(NotificationEvent::ItemReady { filename, .. }) => {
            assert_eq!(filename, "n1.mp4");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_submission_is_an_error() {
    let mut backend = start_scripted(None).await;
    backend
        .send(BackendCommand::SubmitBatch("  \n\n ".to_string()))
        .await;

    match backend
        .wait_for(|e| matches!(e, BackendEvent::Error(_) | BackendEvent::Submitted(_)))
        .await
    {
        BackendEvent::Error(message) => assert!(message.contains("No URLs")),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_dispatch_refusals_are_reported() {
    let mut backend = start_scripted(None).await;
    backend
        .send(BackendCommand::SubmitBatch(post_url("r1")))
        .await;
    let id = match backend
        .wait_for(|e| matches!(e, BackendEvent::Submitted(_)))
        .await
    {
        BackendEvent::Submitted(report) => report.accepted[0],
        _ => unreachable!(),
    };

    backend.send(BackendCommand::DispatchOne(id)).await;
    backend
        .wait_for(|e| matches!(e, BackendEvent::Settled))
        .await;

    // Already Ready
    backend.send(BackendCommand::DispatchOne(id)).await;
    match backend
        .wait_for(|e| matches!(e, BackendEvent::DispatchRejected { .. }))
        .await
    {
        BackendEvent::DispatchRejected { id: rejected, reason } => {
            assert_eq!(rejected, id);
            assert!(reason.contains("not pending"), "{}", reason);
        }
        _ => unreachable!(),
    }

    // Removed
    backend.send(BackendCommand::Remove(id)).await;
    match backend
        .wait_for(|e| matches!(e, BackendEvent::Snapshot(_)))
        .await
    {
        BackendEvent::Snapshot(items) => assert!(items.is_empty()),
        _ => unreachable!(),
    }
    backend.send(BackendCommand::DispatchOne(id)).await;
    match backend
        .wait_for(|e| matches!(e, BackendEvent::DispatchRejected { .. }))
        .await
    {
        BackendEvent::DispatchRejected { reason, .. } => {
            assert!(reason.contains("no longer exists"), "{}", reason)
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_clear_finished_sends_snapshot() {
    let mut backend = start_scripted(None).await;
    let input = [post_url("c1"), post_url("fail-c2")].join("\n");
    backend.send(BackendCommand::SubmitBatch(input)).await;
    backend.send(BackendCommand::DispatchAll).await;
    backend
        .wait_for(|e| matches!(e, BackendEvent::Settled))
        .await;

    backend.send(BackendCommand::ClearFinished).await;
    match backend
        .wait_for(|e| matches!(e, BackendEvent::Snapshot(_)))
        .await
    {
        BackendEvent::Snapshot(items) => assert!(items.is_empty()),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_save_artifact() {
    let media = common::start(vec![Route::bytes("/media/clip.mp4", b"video-bytes".to_vec())]);
    let api = common::start(vec![Route::json(
        "/instagram",
        200,
        json!({
            "success": true,
            "downloadUrl": format!("{}/media/clip.mp4", media),
            "filename": "clip.mp4",
            "type": "video"
        }),
    )]);

    let resolver = Arc::new(DirectLinkResolver::new(
        http_client(Duration::from_secs(5)).unwrap(),
        format!("{}/instagram", api),
    ));
    let mut backend = start(resolver, vec!["instagram.com".to_string()], None).await;

    backend
        .send(BackendCommand::SubmitBatch(
            "https://www.instagram.com/reel/C0abc/".to_string(),
        ))
        .await;
    let id = match backend
        .wait_for(|e| matches!(e, BackendEvent::Submitted(_)))
        .await
    {
        BackendEvent::Submitted(report) => report.accepted[0],
        _ => unreachable!(),
    };

    // Not resolved yet
    backend.send(BackendCommand::SaveArtifact(id)).await;
    match backend
        .wait_for(|e| matches!(e, BackendEvent::Error(_) | BackendEvent::ArtifactSaved { .. }))
        .await
    {
        BackendEvent::Error(message) => assert!(message.contains("not ready")),
        other => panic!("unexpected event {:?}", other),
    }

    backend.send(BackendCommand::DispatchAll).await;
    backend
        .wait_for(|e| matches!(e, BackendEvent::Settled))
        .await;

    backend.send(BackendCommand::SaveArtifact(id)).await;
    match backend
        .wait_for(|e| matches!(e, BackendEvent::Error(_) | BackendEvent::ArtifactSaved { .. }))
        .await
    {
        BackendEvent::ArtifactSaved { id: saved, path } => {
            assert_eq!(saved, id);
            assert_eq!(path.file_name().unwrap(), "clip.mp4");
            assert_eq!(std::fs::read(&path).unwrap(), b"video-bytes");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_actor_stops_when_commands_close() {
    let backend = start_scripted(None).await;
    let Running {
        commands, handle, ..
    } = backend;
    drop(commands);
    timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
