//! Saving resolved artifacts to disk

use crate::resolver::Artifact;
use crate::utils::error::ReelloaderError;
use crate::utils::filename::sanitize_filename;
use anyhow::Result;
use futures::{Stream, StreamExt};
use reqwest::Client;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub retry_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Streams artifact targets into a download directory
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: Client,
    output_dir: PathBuf,
    config: FetchConfig,
}

impl ArtifactFetcher {
    pub fn new(client: Client, output_dir: PathBuf, config: FetchConfig) -> Self {
        Self {
            client,
            output_dir,
            config,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Download the artifact under its suggested filename. Returns the final path.
    ///
    /// The final name is claimed on disk before any bytes are fetched, so
    /// concurrent saves with the same suggested filename land in distinct files.
    pub async fn save(&self, artifact: &Artifact) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = reserve_path(&self.output_dir, &sanitize_filename(&artifact.suggested_filename))
            .await?;

        let mut attempts = 0;
        loop {
            match self.save_attempt(&artifact.target_url, &path).await {
                Ok(bytes) => {
                    info!("Saved {} ({} bytes) to {:?}", artifact.suggested_filename, bytes, path);
                    return Ok(path);
                }
                Err(e) if attempts < self.config.retry_attempts => {
                    attempts += 1;
                    warn!(
                        "Saving {} failed (attempt {}): {}",
                        artifact.suggested_filename, attempts, e
                    );
                    sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        "Saving {} failed after {} attempts: {}",
                        artifact.suggested_filename,
                        attempts + 1,
                        e
                    );
                    // Release the reserved name
                    let _ = tokio::fs::remove_file(&path).await;
                    return Err(e);
                }
            }
        }
    }

    /// Fire-and-forget variant of [`save`](Self::save); failures are only logged.
    pub fn spawn_save(&self, artifact: Artifact) -> JoinHandle<()> {
        let fetcher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = fetcher.save(&artifact).await {
                warn!("Background save of {} failed: {}", artifact.suggested_filename, e);
            }
        })
    }

    /// Single attempt: stream into a private `.part` file, then rename it over
    /// the reserved path
    async fn save_attempt(&self, url: &str, path: &Path) -> Result<u64> {
        debug!("Fetching {} -> {:?}", url, path);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ReelloaderError::DownloadError(format!(
                "HTTP error: {}",
                response.status()
            ))
            .into());
        }

        let part_path = part_path_for(path);
        let written = write_part(response.bytes_stream(), &part_path).await?;

        if let Err(e) = tokio::fs::rename(&part_path, path).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e.into());
        }
        Ok(written)
    }
}

/// Claim `dir/name`, or `dir/name (n).ext` when taken, by creating it
/// exclusively. The returned path exists as an empty placeholder.
async fn reserve_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    let mut counter = 0u32;
    loop {
        let candidate = if counter == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{} ({}){}", stem, counter, ext))
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// `<path>.<uuid>.part`, unique per attempt
fn part_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}.part", name, Uuid::new_v4().simple()))
}

/// Stream `chunks` into `part_path`. The part file is removed on any failure.
async fn write_part<S, B, E>(chunks: S, part_path: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<anyhow::Error>,
{
    let result = copy_chunks(chunks, part_path).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(part_path).await;
    }
    result
}

async fn copy_chunks<S, B, E>(chunks: S, part_path: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<anyhow::Error>,
{
    let mut writer = BufWriter::new(File::create(part_path).await?);
    let mut written = 0u64;
    futures::pin_mut!(chunks);

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return Err(e.into()),
        };
        let bytes = chunk.as_ref();
        writer.write_all(bytes).await?;
        written += bytes.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}
