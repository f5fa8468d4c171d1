// lpad-net/src/download.rs
//! Cancellable archive download with progress reporting.
//!
//! The transfer runs on its own task and reports back over a channel; the
//! version the download was started for travels with the completion event
//! so the installer never has to re-derive it.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use lpad_common::error::{LpadError, Result};
use lpad_common::version::Version;
use reqwest::Client;
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use crate::http::{build_download_client, get_checked};

const EVENT_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDownload {
    pub path: PathBuf,
    pub version: Version,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Percentage in `[0, 100]`, non-decreasing within one download.
    Progress(u8),
    Completed(CompletedDownload),
    Failed(LpadError),
}

impl DownloadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DownloadEvent::Progress(_))
    }
}

/// Requests cooperative cancellation. Calling `cancel` more than once, or
/// once progress has reached 100%, has no further effect.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn cancel(&self) {
        if !self.tx.send_replace(true) {
            debug!("Download cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

#[derive(Debug)]
pub struct DownloadHandle {
    events: mpsc::Receiver<DownloadEvent>,
    cancel: CancelHandle,
    finished: bool,
}

impl DownloadHandle {
    /// Next event in emission order. Returns `None` once the terminal event
    /// has been delivered.
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_download_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Begins streaming `url` into `destination`. Must be called from within a
    /// tokio runtime.
    ///
    /// A partially written destination is left in place on failure.
    pub fn start(&self, url: &str, destination: &Path, version: Version) -> DownloadHandle {
        let (tx, events) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (cancel, cancel_rx) = CancelHandle::new();
        let client = self.client.clone();
        let url = url.to_string();
        let destination = destination.to_path_buf();

        tokio::spawn(async move {
            let outcome = transfer(&client, &url, &destination, version, &tx, cancel_rx).await;
            let event = match outcome {
                Ok(done) => {
                    debug!(
                        "Downloaded {} bytes from {} to {}",
                        done.bytes,
                        url,
                        done.path.display()
                    );
                    DownloadEvent::Completed(done)
                }
                Err(e) => {
                    warn!("Download from {} failed: {}", url, e);
                    DownloadEvent::Failed(e)
                }
            };
            if tx.send(event).await.is_err() {
                debug!("Download receiver dropped before terminal event for {url}");
            }
        });

        DownloadHandle {
            events,
            cancel,
            finished: false,
        }
    }
}

async fn transfer(
    client: &Client,
    url: &str,
    destination: &Path,
    version: Version,
    tx: &mpsc::Sender<DownloadEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) -> Result<CompletedDownload> {
    let cancelled = async move {
        // A dropped sender means nobody can cancel any more.
        if cancel_rx.wait_for(|c| *c).await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(cancelled);

    let response = tokio::select! {
        biased;
        _ = &mut cancelled => return Err(LpadError::Cancelled),
        response = get_checked(client, url) => response?,
    };
    let total = response.content_length().filter(|len| *len > 0);
    debug!(
        "Downloading {} ({} bytes expected) to {}",
        url,
        total.map_or_else(|| "unknown".to_string(), |t| t.to_string()),
        destination.display()
    );

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = TokioFile::create(destination).await.map_err(|e| {
        error!("Failed to create {}: {}", destination.display(), e);
        LpadError::from(e)
    })?;

    let mut reporter = ProgressReporter::new(total);
    send_progress(tx, reporter.update(0)).await?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    loop {
        let chunk = tokio::select! {
            biased;
            _ = &mut cancelled => {
                debug!("Download of {} cancelled after {} bytes", url, written);
                return Err(LpadError::Cancelled);
            }
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let bytes = chunk.map_err(|e| {
            LpadError::Network(format!("Transfer from {url} interrupted: {e}"))
        })?;
        file.write_all(&bytes).await?;
        written += bytes.len() as u64;
        send_progress(tx, reporter.update(written)).await?;
        // Every declared byte is on disk; a cancel from here on is too late.
        if total.is_some_and(|t| written >= t) {
            break;
        }
    }
    file.flush().await?;
    drop(file);

    if let Some(expected) = total {
        if written < expected {
            return Err(LpadError::Network(format!(
                "Transfer from {url} ended early: {written} of {expected} bytes"
            )));
        }
    }
    send_progress(tx, reporter.finish()).await?;

    Ok(CompletedDownload {
        path: destination.to_path_buf(),
        version,
        bytes: written,
    })
}

async fn send_progress(tx: &mpsc::Sender<DownloadEvent>, percent: Option<u8>) -> Result<()> {
    if let Some(percent) = percent {
        tx.send(DownloadEvent::Progress(percent))
            .await
            .map_err(|_| LpadError::Cancelled)?;
    }
    Ok(())
}

/// Converts byte counts into percentages, emitting only on change.
struct ProgressReporter {
    total: Option<u64>,
    last: Option<u8>,
}

impl ProgressReporter {
    fn new(total: Option<u64>) -> Self {
        Self { total, last: None }
    }

    fn update(&mut self, written: u64) -> Option<u8> {
        let percent = match self.total {
            Some(total) => ((written.min(total) * 100) / total) as u8,
            None => 0,
        };
        self.emit(percent)
    }

    fn finish(&mut self) -> Option<u8> {
        self.emit(100)
    }

    fn emit(&mut self, percent: u8) -> Option<u8> {
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_is_monotonic_and_bounded() {
        let mut r = ProgressReporter::new(Some(200));
        assert_eq!(r.update(0), Some(0));
        assert_eq!(r.update(1), None);
        assert_eq!(r.update(100), Some(50));
        assert_eq!(r.update(90), None);
        assert_eq!(r.update(500), Some(100));
        assert_eq!(r.finish(), None);
    }

    #[test]
    fn reporter_without_length_jumps_to_done() {
        let mut r = ProgressReporter::new(None);
        assert_eq!(r.update(0), Some(0));
        assert_eq!(r.update(4096), None);
        assert_eq!(r.finish(), Some(100));
    }

    #[test]
    fn cancel_is_idempotent() {
        let (handle, rx) = CancelHandle::new();
        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.clone().cancel();
        assert!(handle.is_cancelled());
        assert!(*rx.borrow());
    }
}
