//! # Live-coding session controller
//!
//! ## Responsibility
//! Owns one participant's view of a challenge and wires the pieces
//! together: the join flow, the two-buffer editor, the countdown, the
//! autosave pipeline, the activity heartbeat and the focus monitor.
//!
//! ## Activation
//! The background services only run while the participant has joined an
//! active challenge. [`LiveCodingSession::activate`] starts them all and
//! [`LiveCodingSession::deactivate`] (also run on drop) stops them all.
//!
//! ## Edit gate
//! A `watch<bool>` shared with the autosave task. It is open only while the
//! challenge is active, not locked and the deadline has not passed. The
//! editor's read-only flag always mirrors it while the session is active.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::api::ChallengeApi;
use crate::autosave::{Autosave, SaveStatus, SaveTarget};
use crate::clock::SharedClock;
use crate::config::ClientConfig;
use crate::cookie::CookieJar;
use crate::countdown::{format_remaining, Countdown, Deadline};
use crate::editor::{ActiveTab, Buffers, Editor, EditorResponse};
use crate::error::{Result, SessionError};
use crate::focus::{Directive, Disposition, FocusEvent, FocusMonitor};
use crate::heartbeat::Heartbeat;
use crate::keys::{KeyCombo, KeyOutcome};
use crate::models::{ActivityPing, Challenge, Participant};
use crate::session::{ChallengeSession, SessionState};

/// Services that exist only while the session is active.
struct Running {
    countdown: Countdown,
    autosave: Autosave,
    heartbeat: Heartbeat,
    expiry: JoinHandle<()>,
}

impl Running {
    fn stop(mut self) {
        self.expiry.abort();
        self.countdown.stop();
        self.autosave.stop();
        self.heartbeat.stop();
    }
}

pub struct LiveCodingSession {
    api: Arc<dyn ChallengeApi>,
    clock: SharedClock,
    config: ClientConfig,
    session: Arc<ChallengeSession>,
    editor: Arc<Mutex<Editor>>,
    gate: Arc<watch::Sender<bool>>,
    focus: FocusMonitor,
    running: Option<Running>,
}

impl LiveCodingSession {
    pub fn new(
        api: Arc<dyn ChallengeApi>,
        cookies: Arc<CookieJar>,
        clock: SharedClock,
        config: ClientConfig,
        access_code: impl Into<String>,
    ) -> Self {
        let session = Arc::new(ChallengeSession::new(
            api.clone(),
            cookies,
            clock.clone(),
            access_code,
        ));
        let (gate, _) = watch::channel(false);
        Self {
            editor: Arc::new(Mutex::new(Editor::new(config.max_suggestions))),
            api,
            clock,
            config,
            session,
            gate: Arc::new(gate),
            focus: FocusMonitor::new(),
            running: None,
        }
    }

    /// Load the challenge and, for a returning participant, restore the
    /// saved buffers and activate.
    pub async fn mount(&mut self) -> Result<SessionState> {
        let saved = self.session.load().await?;
        if let Some(saved) = saved {
            self.lock_editor().load(Buffers::from(saved));
        }
        self.sync_gate();
        if self.can_activate() {
            self.activate()?;
        }
        Ok(self.state())
    }

    pub async fn join(&mut self, team_id: &str) -> Result<Participant> {
        let participant = self.session.join(team_id).await?;
        self.sync_gate();
        if self.can_activate() {
            self.activate()?;
        }
        Ok(participant)
    }

    /// Start the countdown, autosave, heartbeat and focus monitor.
    ///
    /// A no-op when already active.
    ///
    /// # Errors
    /// [`SessionError::NotJoined`] without a participant and
    /// [`SessionError::EditingLocked`] when the challenge is not active.
    pub fn activate(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Ok(());
        }
        let state = self.session.state();
        let (Some(challenge), Some(participant)) = (state.challenge(), state.participant()) else {
            return Err(SessionError::NotJoined);
        };
        if !challenge.status.is_active() {
            return Err(SessionError::EditingLocked);
        }

        let countdown = Countdown::start(
            Deadline::for_challenge(challenge),
            self.clock.clone(),
            self.config.countdown_tick(),
        );
        let expiry = Self::spawn_expiry(&countdown, self.editor.clone(), self.gate.clone());
        let autosave = Autosave::start(
            self.api.clone(),
            self.editor.clone(),
            SaveTarget {
                challenge_id: challenge.id.clone(),
                participant_id: participant.id.clone(),
            },
            self.gate.subscribe(),
            self.clock.clone(),
            self.config.autosave_debounce(),
        );
        let heartbeat = Heartbeat::start(
            self.api.clone(),
            ActivityPing {
                participant_id: participant.id.clone(),
                challenge_id: challenge.id.clone(),
            },
            self.config.heartbeat_interval(),
        );
        self.focus.start();

        info!(
            access_code = %self.session.access_code(),
            participant_id = %participant.id,
            "session activated"
        );
        self.running = Some(Running {
            countdown,
            autosave,
            heartbeat,
            expiry,
        });
        self.sync_gate();
        Ok(())
    }

    /// Stop every background service. Safe to call repeatedly.
    pub fn deactivate(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop();
            info!(access_code = %self.session.access_code(), "session deactivated");
        }
        self.focus.stop();
        self.gate.send_replace(false);
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_editable(&self) -> bool {
        *self.gate.borrow()
    }

    /// The host's textarea changed. Rejected while the focus modal is up.
    pub fn input(&self, text: &str, cursor: usize) -> EditorResponse {
        if self.focus.modal_visible() {
            debug!("input rejected, focus modal is visible");
            return EditorResponse {
                key: KeyOutcome::Ignored,
                changed: false,
            };
        }
        let response = self.lock_editor().input(text, cursor);
        if response.changed {
            self.schedule_save();
        }
        response
    }

    /// Key-down in the editor. Blocked shortcuts are handled by the focus
    /// monitor and never reach the editor, nor does anything while the
    /// focus modal is up.
    pub fn key(&mut self, key: &KeyCombo) -> KeyOutcome {
        if self.focus.handle(&FocusEvent::KeyDown(key.clone())) == Disposition::PreventDefault
            || self.focus.modal_visible()
        {
            return KeyOutcome::Consumed;
        }
        let response = self.lock_editor().key(key);
        if response.changed {
            self.schedule_save();
        }
        response.key
    }

    pub fn switch_tab(&self, tab: ActiveTab) {
        self.lock_editor().switch_tab(tab);
    }

    pub fn focus_event(&mut self, event: &FocusEvent) -> Disposition {
        self.focus.handle(event)
    }

    pub fn acknowledge_modal(&mut self) -> Directive {
        self.focus.acknowledge()
    }

    pub fn focus(&self) -> &FocusMonitor {
        &self.focus
    }

    /// Save both buffers now.
    pub async fn save_now(&self) -> Result<()> {
        match &self.running {
            Some(running) => running.autosave.flush().await,
            None => Err(SessionError::NotJoined),
        }
    }

    /// Re-fetch the challenge and follow status or lock changes.
    pub async fn refresh(&mut self) -> Result<Challenge> {
        let challenge = self.session.refresh().await?;
        if !challenge.status.is_active() {
            if self.running.is_some() {
                info!(status = %challenge.status, "challenge no longer active");
            }
            self.deactivate();
        } else if self.can_activate() {
            self.activate()?;
            self.retime(&challenge);
        }
        self.sync_gate();
        Ok(challenge)
    }

    /// Follow a moved `end_time`: retarget the countdown and re-arm the
    /// expiry watcher so a later deadline reopens editing.
    fn retime(&mut self, challenge: &Challenge) {
        let deadline = Deadline::for_challenge(challenge);
        let Some(running) = self.running.as_mut() else {
            return;
        };
        if running.countdown.deadline() == deadline {
            return;
        }
        info!(?deadline, "challenge deadline changed");
        running.expiry.abort();
        running.countdown.retarget(deadline);
        running.expiry =
            Self::spawn_expiry(&running.countdown, self.editor.clone(), self.gate.clone());
    }

    /// Seconds left. Before activation this is derived from the challenge.
    pub fn remaining(&self) -> Option<u64> {
        match &self.running {
            Some(running) => running.countdown.remaining(),
            None => self.state().challenge().and_then(|c| {
                Deadline::for_challenge(c).remaining_at(self.clock.now_ms())
            }),
        }
    }

    pub fn countdown_display(&self) -> String {
        format_remaining(self.remaining())
    }

    pub fn save_status(&self) -> SaveStatus {
        self.running
            .as_ref()
            .map(|r| r.autosave.status())
            .unwrap_or_default()
    }

    /// Save status updates; `None` while inactive.
    pub fn subscribe_save_status(&self) -> Option<watch::Receiver<SaveStatus>> {
        self.running.as_ref().map(|r| r.autosave.subscribe())
    }

    /// Countdown updates; `None` while inactive.
    pub fn subscribe_remaining(&self) -> Option<watch::Receiver<Option<u64>>> {
        self.running.as_ref().map(|r| r.countdown.subscribe())
    }

    pub fn editor(&self) -> MutexGuard<'_, Editor> {
        self.lock_editor()
    }

    fn can_activate(&self) -> bool {
        let state = self.session.state();
        state.is_joined() && state.challenge().is_some_and(|c| c.status.is_active())
    }

    fn deadline_passed(&self) -> bool {
        self.running.as_ref().is_some_and(|r| {
            r.countdown.deadline().is_live() && r.countdown.remaining() == Some(0)
        })
    }

    /// Recompute the edit gate and mirror it into the editor.
    fn sync_gate(&self) {
        let editable = self.running.is_some()
            && self.state().challenge().is_some_and(Challenge::is_editable)
            && !self.deadline_passed();
        self.gate.send_replace(editable);
        self.lock_editor().set_read_only(!editable);
    }

    fn schedule_save(&self) {
        match &self.running {
            Some(running) if self.is_editable() => running.autosave.notify_edit(),
            _ => debug!("edit not scheduled for autosave, editing is closed"),
        }
    }

    /// Close the gate once a live countdown hits zero.
    fn spawn_expiry(
        countdown: &Countdown,
        editor: Arc<Mutex<Editor>>,
        gate: Arc<watch::Sender<bool>>,
    ) -> JoinHandle<()> {
        let mut rx = countdown.subscribe();
        let live = countdown.deadline().is_live();
        tokio::spawn(async move {
            if !live {
                return;
            }
            if rx.wait_for(|r| *r == Some(0)).await.is_ok() {
                gate.send_replace(false);
                editor
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .set_read_only(true);
                info!("deadline reached, editor is read-only");
            }
        })
    }

    fn lock_editor(&self) -> MutexGuard<'_, Editor> {
        self.editor.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for LiveCodingSession {
    fn drop(&mut self) {
        self.deactivate();
    }
}
