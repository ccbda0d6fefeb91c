//! Shared helpers for integration tests: a canned-response HTTP server,
//! a scripted resolver and a recording notification sink.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use reelloader::queue::{NotificationEvent, NotificationSink};
use reelloader::resolver::{Artifact, MediaKind, Resolver};
use reelloader::utils::UrlValidator;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Host accepted by [`validator`]; URLs look like `https://site/p/<code>`
pub const TEST_HOST: &str = "site";

pub fn validator() -> UrlValidator {
    UrlValidator::new(vec![TEST_HOST.to_string()])
}

pub fn post_url(code: &str) -> String {
    format!("https://{}/p/{}/", TEST_HOST, code)
}

// ============================================================================
// HTTP SERVER
// ============================================================================

/// One canned response, matched on the request path (query ignored)
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Route {
    pub fn json(path: &str, status: u16, body: serde_json::Value) -> Self {
        Self {
            path: path.to_string(),
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    pub fn bytes(path: &str, body: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            status: 200,
            content_type: "application/octet-stream",
            body,
        }
    }
}

/// Starts a server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345"). Unknown paths get 404.
/// The server runs until the process exits.
pub fn start(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: std::net::TcpStream, routes: &[Route]) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };

    // "GET /path?query HTTP/1.1"
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");
    let path = target.split('?').next().unwrap_or("/");

    let (status, content_type, body) = match routes.iter().find(|r| r.path == path) {
        Some(route) => (route.status, route.content_type, route.body.as_slice()),
        None => (404, "text/plain", &b"not found"[..]),
    };
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason_phrase(status),
        content_type,
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

// ============================================================================
// SCRIPTED RESOLVER
// ============================================================================

/// Resolver whose answers are fixed per URL.
///
/// URLs containing `fail` are rejected, `empty` yields an artifact without a
/// link, `hang` never returns; everything else succeeds. When gated,
/// every call waits for a permit from [`ScriptedResolver::release`] so tests
/// can hold items in flight.
pub struct ScriptedResolver {
    calls: Mutex<HashMap<String, usize>>,
    gate: Option<Semaphore>,
    current: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
            gate: None,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    /// Let `n` gated calls finish
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Highest number of calls that were running at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn in_progress(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for ScriptedResolver {
    fn id(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, _url: &str) -> bool {
        true
    }

    async fn resolve(&self, url: &str) -> Result<Artifact> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.current.fetch_sub(1, Ordering::SeqCst);

        if url.contains("hang") {
            std::future::pending::<()>().await;
        }
        if url.contains("fail") {
            anyhow::bail!("media is private");
        }
        if url.contains("empty") {
            return Ok(Artifact {
                target_url: String::new(),
                suggested_filename: "empty.mp4".to_string(),
                media_kind: MediaKind::Video,
            });
        }
        let code = url.trim_end_matches('/').rsplit('/').next().unwrap_or("x");
        Ok(Artifact {
            target_url: format!("https://cdn.test/{}.mp4", code),
            suggested_filename: format!("{}.mp4", code),
            media_kind: MediaKind::Video,
        })
    }
}

// ============================================================================
// RECORDING SINK
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn ready_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NotificationEvent::ItemReady { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, NotificationEvent::ItemFailed { .. }))
            .count()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, event: &NotificationEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Sink that always fails
pub struct BrokenSink;

#[async_trait]
impl NotificationSink for BrokenSink {
    async fn notify(&self, _event: &NotificationEvent) -> Result<()> {
        anyhow::bail!("sink unavailable")
    }
}
