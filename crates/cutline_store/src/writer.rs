//! Debounced write-behind for session snapshots.
//!
//! The editor hands over cloned [`Timeline`] snapshots; a background task
//! writes the newest one once no further snapshot has arrived for the
//! configured quiet period. Snapshots that fail validation are never written,
//! so the file on disk is always the last good state.

use crate::error::{Result, StoreError};
use cutline_core::{CoreError, EditorConfig, Timeline};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Outcome of the most recent write attempt. Revisions count scheduled
/// snapshots, starting at 1.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteStatus {
    Idle,
    Saved { revision: u64 },
    Rejected { revision: u64, violations: usize },
    Failed { revision: u64, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    NothingPending,
    Saved { revision: u64 },
}

enum Message {
    Schedule(Timeline),
    Flush(oneshot::Sender<Result<FlushOutcome>>),
}

pub struct SessionWriter {
    tx: mpsc::UnboundedSender<Message>,
    status: watch::Receiver<WriteStatus>,
    task: JoinHandle<()>,
}

impl SessionWriter {
    /// Start the writer task. Must be called from within a tokio runtime.
    pub fn spawn(path: impl Into<PathBuf>, config: &EditorConfig) -> Self {
        let path = path.into();
        let debounce = Duration::from_millis(config.save_debounce_ms);
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(WriteStatus::Idle);

        tracing::debug!(path = %path.display(), debounce_ms = config.save_debounce_ms, "session writer started");
        let task = tokio::spawn(run(path, debounce, rx, status_tx));
        Self { tx, status, task }
    }

    /// Queue a snapshot. Replaces any snapshot not yet written.
    pub fn schedule(&self, timeline: &Timeline) -> Result<()> {
        self.tx
            .send(Message::Schedule(timeline.clone()))
            .map_err(|_| StoreError::Closed)
    }

    /// Write the pending snapshot now, without waiting for the quiet period.
    pub async fn flush(&self) -> Result<FlushOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Message::Flush(reply_tx))
            .map_err(|_| StoreError::Closed)?;
        reply_rx.await.map_err(|_| StoreError::Closed)?
    }

    pub fn status(&self) -> watch::Receiver<WriteStatus> {
        self.status.clone()
    }

    /// Flush and stop the background task.
    pub async fn shutdown(self) -> Result<FlushOutcome> {
        let outcome = self.flush().await;
        let SessionWriter { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            tracing::error!(error = %e, "session writer task did not stop cleanly");
        }
        outcome
    }
}

/// Read, migrate and validate a session file.
pub async fn load_session(path: impl AsRef<Path>) -> Result<Timeline> {
    let data = tokio::fs::read_to_string(path.as_ref()).await?;
    Ok(Timeline::from_session_json(&data)?)
}

async fn run(
    path: PathBuf,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<Message>,
    status: watch::Sender<WriteStatus>,
) {
    let mut revision = 0u64;
    let mut pending: Option<Timeline> = None;

    loop {
        let message = if pending.is_some() {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(message) => message,
                Err(_) => {
                    if let Some(timeline) = pending.take() {
                        let _ = write_snapshot(&path, &timeline, revision, &status).await;
                    }
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match message {
            Some(Message::Schedule(timeline)) => {
                revision += 1;
                pending = Some(timeline);
            }
            Some(Message::Flush(reply)) => {
                let outcome = match pending.take() {
                    Some(timeline) => write_snapshot(&path, &timeline, revision, &status)
                        .await
                        .map(|()| FlushOutcome::Saved { revision }),
                    None => Ok(FlushOutcome::NothingPending),
                };
                let _ = reply.send(outcome);
            }
            None => {
                if let Some(timeline) = pending.take() {
                    let _ = write_snapshot(&path, &timeline, revision, &status).await;
                }
                break;
            }
        }
    }

    tracing::debug!(path = %path.display(), "session writer stopped");
}

async fn write_snapshot(
    path: &Path,
    timeline: &Timeline,
    revision: u64,
    status: &watch::Sender<WriteStatus>,
) -> Result<()> {
    let json = match timeline.to_session_json() {
        Ok(json) => json,
        Err(CoreError::OverlappingClips(violations)) => {
            tracing::warn!(
                revision,
                violations = violations.len(),
                path = %path.display(),
                "session write rejected, keeping last good file"
            );
            status.send_replace(WriteStatus::Rejected {
                revision,
                violations: violations.len(),
            });
            return Err(CoreError::OverlappingClips(violations).into());
        }
        Err(e) => {
            tracing::error!(revision, path = %path.display(), error = %e, "session encode failed");
            status.send_replace(WriteStatus::Failed {
                revision,
                message: e.to_string(),
            });
            return Err(e.into());
        }
    };

    match write_atomically(path, json.as_bytes()).await {
        Ok(()) => {
            tracing::info!(revision, path = %path.display(), "session saved");
            status.send_replace(WriteStatus::Saved { revision });
            Ok(())
        }
        Err(e) => {
            tracing::error!(revision, path = %path.display(), error = %e, "session write failed");
            status.send_replace(WriteStatus::Failed {
                revision,
                message: e.to_string(),
            });
            Err(e.into())
        }
    }
}

/// Write to a sibling temp file and rename over the target.
async fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await
}
