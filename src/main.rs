//! Reelloader - batch resolver for Instagram media links
//!
//! Reads one URL per line, resolves every link concurrently through the
//! configured resolver and prints the outcome of each. With `--save` the
//! resolved artifacts are downloaded as well.

use anyhow::{Context, Result};
use clap::Parser;
use reelloader::queue::{ItemState, QueueItem, QueueSummary};
use reelloader::resolver;
use reelloader::utils::{platform, AppSettings, ResolverKind};
use reelloader::{BackendActor, BackendCommand, BackendEvent};
use std::io::Read;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reelloader", version, about)]
struct Args {
    /// File with one URL per line (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of concurrent resolutions
    #[arg(long)]
    concurrency: Option<usize>,

    /// Resolver backend
    #[arg(long, value_enum)]
    resolver: Option<ResolverKind>,

    /// Download every resolved artifact
    #[arg(long)]
    save: bool,

    /// Download directory used with --save
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append notifications to the event journal
    #[arg(long)]
    journal: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command-line flags win over the settings file
    fn apply(&self, mut settings: AppSettings) -> AppSettings {
        if let Some(n) = self.concurrency {
            settings.max_concurrent = Some(n);
        }
        if let Some(kind) = self.resolver {
            settings.resolver = kind;
        }
        if let Some(dir) = &self.output {
            settings.download_location = dir.clone();
        }
        if self.journal {
            settings.journal = true;
        }
        settings.validated()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only the report
    let default_filter = if args.verbose {
        "reelloader=debug"
    } else {
        "reelloader=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let input = read_input(args.input.as_ref())?;

    let config_path = args.config.clone().unwrap_or_else(platform::settings_path);
    let settings = match AppSettings::load(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Ignoring settings file: {}", e);
            AppSettings::default()
        }
    };
    let settings = args.apply(settings);
    info!(
        "Resolver: {}, concurrency: {}",
        settings.resolver.as_str(),
        settings
            .max_concurrent
            .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
    );

    let resolver = resolver::build_resolver(&settings)?;

    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    let (event_tx, mut event_rx) = mpsc::channel(100);
    let actor = BackendActor::new(settings, resolver, cmd_rx, event_tx).await?;
    let actor_handle = tokio::spawn(actor.run());

    cmd_tx.send(BackendCommand::SubmitBatch(input)).await?;
    cmd_tx.send(BackendCommand::DispatchAll).await?;

    // 1. Resolve everything
    while let Some(event) = event_rx.recv().await {
        match event {
            BackendEvent::Submitted(report) => {
                for rejection in &report.rejected {
                    println!("REJECTED  {}  ({})", rejection.url, rejection.reason.as_str());
                }
            }
            BackendEvent::Dispatched(ids) => debug!("Dispatched {} items", ids.len()),
            BackendEvent::Error(message) => eprintln!("{}", message),
            BackendEvent::Settled => break,
            other => debug!("Event: {:?}", other),
        }
    }

    // 2. Report from the store itself
    cmd_tx.send(BackendCommand::Snapshot).await?;
    let mut items = Vec::new();
    while let Some(event) = event_rx.recv().await {
        if let BackendEvent::Snapshot(snapshot) = event {
            items = snapshot;
            break;
        }
    }
    for item in &items {
        println!("{}", report_line(item));
    }

    // 3. Optional downloads
    if args.save {
        let ready: Vec<_> = items.iter().filter(|i| i.artifact().is_some()).collect();
        for item in &ready {
            cmd_tx.send(BackendCommand::SaveArtifact(item.id())).await?;
        }

        let mut outstanding = ready.len();
        while outstanding > 0 {
            match event_rx.recv().await {
                Some(BackendEvent::ArtifactSaved { path, .. }) => {
                    outstanding -= 1;
                    println!("SAVED     {}", path.display());
                }
                Some(BackendEvent::Error(message)) => {
                    outstanding -= 1;
                    eprintln!("{}", message);
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    println!("{}", summary_line(&summarize(&items)));

    let _ = cmd_tx.send(BackendCommand::Shutdown).await;
    let _ = actor_handle.await;
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn report_line(item: &QueueItem) -> String {
    match item.state() {
        ItemState::Ready(artifact) => format!(
            "READY     {}  {} [{}]",
            item.url(),
            artifact.suggested_filename,
            artifact.media_kind
        ),
        ItemState::Failed(reason) => format!("FAILED    {}  {}", item.url(), reason),
        _ => format!(
            "{:<9} {}",
            item.status().to_string().to_uppercase(),
            item.url()
        ),
    }
}

fn summarize(items: &[QueueItem]) -> QueueSummary {
    let mut summary = QueueSummary::default();
    for item in items {
        match item.state() {
            ItemState::Pending => summary.pending += 1,
            ItemState::InFlight => summary.in_flight += 1,
            ItemState::Ready(_) => summary.ready += 1,
            ItemState::Failed(_) => summary.failed += 1,
        }
    }
    summary
}

fn summary_line(summary: &QueueSummary) -> String {
    format!(
        "{} ready, {} failed, {} total",
        summary.ready,
        summary.failed,
        summary.total()
    )
}
