//! # Autosave pipeline
//!
//! ## Responsibility
//! Debounces buffer edits and persists both buffers together through
//! [`ChallengeApi::save_submission`], publishing a [`SaveStatus`].
//!
//! ## State machine
//! `Idle → Pending(deadline) → Saving → Saved(at)`; a new edit while
//! `Pending` moves the deadline, it never queues a second save.
//!
//! ## Guarantees
//! - Coalescing: only the last edit inside the debounce window fires.
//! - Fresh data: buffers are read from the [`BufferSource`] when the save
//!   fires, never captured when the edit was scheduled.
//! - Fire-time gate: a closed edit gate (challenge not active or locked)
//!   drops the save even if the timer was armed before the gate closed.
//! - Explicit saves ([`Autosave::flush`]) run on the same task and cancel the
//!   pending deadline, so they cannot race the debounced save.
//! - Failure never marks the buffers as saved; status returns to what it was
//!   before the attempt.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::ChallengeApi;
use crate::clock::SharedClock;
use crate::editor::{Buffers, Editor};
use crate::error::{Result, SessionError};
use crate::models::SubmissionPayload;

/// Save status as shown to the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved(DateTime<Utc>),
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveStatus::Idle => write!(f, "not saved yet"),
            SaveStatus::Saving => write!(f, "saving..."),
            SaveStatus::Saved(at) => write!(f, "saved at {}", at.format("%H:%M:%S")),
        }
    }
}

/// Where the pipeline reads the latest buffers from at fire time.
pub trait BufferSource: Send + Sync {
    fn snapshot(&self) -> Buffers;
}

impl BufferSource for Mutex<Buffers> {
    fn snapshot(&self) -> Buffers {
        self.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl BufferSource for Mutex<Editor> {
    fn snapshot(&self) -> Buffers {
        self.lock().unwrap_or_else(|e| e.into_inner()).buffers().clone()
    }
}

/// Who the submission belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    pub challenge_id: String,
    pub participant_id: String,
}

enum Command {
    Edit,
    Flush(oneshot::Sender<Result<()>>),
}

/// Handle to the running pipeline. Dropping it stops the task.
pub struct Autosave {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    pending: watch::Receiver<bool>,
    task: Option<JoinHandle<()>>,
}

struct Worker {
    api: Arc<dyn ChallengeApi>,
    source: Arc<dyn BufferSource>,
    target: SaveTarget,
    gate: watch::Receiver<bool>,
    clock: SharedClock,
    status: watch::Sender<SaveStatus>,
    pending: watch::Sender<bool>,
    debounce: Duration,
}

impl Autosave {
    /// Spawn the pipeline.
    ///
    /// `gate` carries "editing allowed"; it is read at fire time.
    pub fn start(
        api: Arc<dyn ChallengeApi>,
        source: Arc<dyn BufferSource>,
        target: SaveTarget,
        gate: watch::Receiver<bool>,
        clock: SharedClock,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);
        let (pending_tx, pending_rx) = watch::channel(false);

        let worker = Worker {
            api,
            source,
            target,
            gate,
            clock,
            status: status_tx,
            pending: pending_tx,
            debounce,
        };
        let task = tokio::spawn(worker.run(rx));

        Self {
            tx,
            status: status_rx,
            pending: pending_rx,
            task: Some(task),
        }
    }

    /// Restart the debounce window.
    pub fn notify_edit(&self) {
        if self.tx.send(Command::Edit).is_err() {
            debug!("autosave stopped, edit not scheduled");
        }
    }

    /// Save now, cancelling any pending debounced save.
    ///
    /// # Errors
    /// - [`SessionError::EditingLocked`] when the gate is closed.
    /// - [`SessionError::Stopped`] after [`stop`](Self::stop).
    /// - Whatever the API returned when the save itself failed.
    pub async fn flush(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply_tx))
            .map_err(|_| SessionError::Stopped)?;
        reply_rx.await.map_err(|_| SessionError::Stopped)?
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// An edit is waiting for its debounce window to close.
    pub fn is_pending(&self) -> bool {
        *self.pending.borrow()
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Edit) => {
                        deadline = Some(Instant::now() + self.debounce);
                        self.pending.send_replace(true);
                    }
                    Some(Command::Flush(reply)) => {
                        deadline = None;
                        self.pending.send_replace(false);
                        let result = if self.editable() {
                            self.save().await
                        } else {
                            Err(SessionError::EditingLocked)
                        };
                        let _ = reply.send(result);
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.pending.send_replace(false);
                    if self.editable() {
                        // Failures are logged inside save(); editing carries on.
                        let _ = self.save().await;
                    } else {
                        debug!("editing locked, debounced save dropped");
                    }
                }
            }
        }
    }

    fn editable(&self) -> bool {
        *self.gate.borrow()
    }

    async fn save(&self) -> Result<()> {
        let before = *self.status.borrow();
        self.status.send_replace(SaveStatus::Saving);

        let buffers = self.source.snapshot();
        let payload = SubmissionPayload {
            challenge_id: self.target.challenge_id.clone(),
            participant_id: self.target.participant_id.clone(),
            html_code: buffers.html,
            css_code: buffers.css,
        };

        match self.api.save_submission(&payload).await {
            Ok(()) => {
                let at = self.clock.now();
                debug!(participant_id = %self.target.participant_id, "submission saved");
                self.status.send_replace(SaveStatus::Saved(at));
                Ok(())
            }
            Err(e) => {
                warn!(
                    error = %e,
                    participant_id = %self.target.participant_id,
                    "autosave failed, keeping previous save status"
                );
                self.status.send_replace(before);
                Err(e)
            }
        }
    }
}
