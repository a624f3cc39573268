//! In-memory [`ChallengeApi`] for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::ChallengeApi;
use crate::error::{Result, SessionError};
use crate::models::{
    ActivityPing, Challenge, ChallengeEnvelope, ChallengeStatus, Participant, SavedSubmission,
    SubmissionPayload, Team,
};

pub fn challenge(status: ChallengeStatus) -> Challenge {
    Challenge {
        id: "7".into(),
        title: "Landing page sprint".into(),
        description: String::new(),
        instructions: "Build the hero section".into(),
        status,
        duration_minutes: Some(30),
        end_time: None,
        is_editing_locked: false,
    }
}

pub fn participant() -> Participant {
    Participant {
        id: "99".into(),
        challenge_id: "7".into(),
        team_id: "1".into(),
        team_name: "Red".into(),
    }
}

pub fn envelope(challenge: Challenge, joined: bool) -> ChallengeEnvelope {
    ChallengeEnvelope {
        challenge,
        teams: vec![
            Team {
                id: "1".into(),
                name: "Red".into(),
                member_count: 2,
            },
            Team {
                id: "2".into(),
                name: "Blue".into(),
                member_count: 0,
            },
        ],
        joined,
        participant: joined.then(participant),
        submission: joined.then(|| SavedSubmission {
            html_code: "<h1>saved</h1>".into(),
            css_code: "h1 { color: teal; }".into(),
        }),
    }
}

#[derive(Default)]
pub struct MockApi {
    envelope: Mutex<Option<ChallengeEnvelope>>,
    join_error: Mutex<Option<(u16, String)>>,
    fail_saves: AtomicBool,
    fail_pings: AtomicBool,
    /// When set, `join` waits for a notification before answering.
    join_gate: Mutex<Option<Arc<Notify>>>,
    saves: Mutex<Vec<SubmissionPayload>>,
    cookies_seen: Mutex<Vec<Option<String>>>,
    pub fetch_calls: AtomicUsize,
    pub join_calls: AtomicUsize,
    pub ping_calls: AtomicUsize,
}

impl MockApi {
    pub fn with_envelope(envelope: ChallengeEnvelope) -> Self {
        let api = Self::default();
        api.set_envelope(Some(envelope));
        api
    }

    /// `None` makes `fetch_challenge` answer not-found.
    pub fn set_envelope(&self, envelope: Option<ChallengeEnvelope>) {
        *self.envelope.lock().unwrap() = envelope;
    }

    pub fn update_challenge(&self, f: impl FnOnce(&mut Challenge)) {
        if let Some(env) = self.envelope.lock().unwrap().as_mut() {
            f(&mut env.challenge);
        }
    }

    pub fn fail_joins(&self, status: u16, message: &str) {
        *self.join_error.lock().unwrap() = Some((status, message.to_string()));
    }

    pub fn clear_join_failure(&self) {
        *self.join_error.lock().unwrap() = None;
    }

    pub fn hold_joins(&self) -> Arc<Notify> {
        let n = Arc::new(Notify::new());
        *self.join_gate.lock().unwrap() = Some(n.clone());
        n
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }

    pub fn saves(&self) -> Vec<SubmissionPayload> {
        self.saves.lock().unwrap().clone()
    }

    pub fn cookies_seen(&self) -> Vec<Option<String>> {
        self.cookies_seen.lock().unwrap().clone()
    }

    fn http(status: u16, message: &str) -> SessionError {
        SessionError::Http {
            status,
            url: "mock://".into(),
            message: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl ChallengeApi for MockApi {
    async fn fetch_challenge(
        &self,
        access_code: &str,
        participant_cookie: Option<&str>,
    ) -> Result<ChallengeEnvelope> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.cookies_seen
            .lock()
            .unwrap()
            .push(participant_cookie.map(str::to_string));
        self.envelope
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SessionError::NotFound(access_code.to_string()))
    }

    async fn join(&self, _access_code: &str, team_id: &str) -> Result<Participant> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.join_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some((status, msg)) = self.join_error.lock().unwrap().clone() {
            return Err(Self::http(status, &msg));
        }
        let mut p = participant();
        p.team_id = team_id.to_string();
        Ok(p)
    }

    async fn save_submission(&self, payload: &SubmissionPayload) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Self::http(500, "database unavailable"));
        }
        self.saves.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn ping_activity(&self, _ping: &ActivityPing) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pings.load(Ordering::SeqCst) {
            return Err(Self::http(503, "busy"));
        }
        Ok(())
    }
}
