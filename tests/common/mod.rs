//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use livecode_session::api::ChallengeApi;
use livecode_session::models::{
    ActivityPing, Challenge, ChallengeEnvelope, ChallengeStatus, Participant, SavedSubmission,
    SubmissionPayload, Team,
};
use livecode_session::{Result, SessionError};

pub const T0: i64 = 1_760_000_000_000;

pub fn challenge(status: ChallengeStatus, end_time: Option<&str>) -> Challenge {
    Challenge {
        id: "12".into(),
        title: "Portfolio header".into(),
        description: "Recreate the mockup".into(),
        instructions: "Use flexbox".into(),
        status,
        duration_minutes: Some(45),
        end_time: end_time.map(str::to_string),
        is_editing_locked: false,
    }
}

/// Backend double: one challenge, join always lands on the requested team.
pub struct FakeBackend {
    challenge: Mutex<Challenge>,
    participant: Mutex<Option<Participant>>,
    submission: Mutex<Option<SavedSubmission>>,
    pub saves: Mutex<Vec<SubmissionPayload>>,
    pub pings: AtomicUsize,
    pub fetches: AtomicUsize,
    pub last_cookie: Mutex<Option<String>>,
}

impl FakeBackend {
    pub fn new(challenge: Challenge) -> Self {
        Self {
            challenge: Mutex::new(challenge),
            participant: Mutex::new(None),
            submission: Mutex::new(None),
            saves: Mutex::new(Vec::new()),
            pings: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            last_cookie: Mutex::new(None),
        }
    }

    pub fn edit_challenge(&self, f: impl FnOnce(&mut Challenge)) {
        f(&mut self.challenge.lock().unwrap());
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> Vec<SubmissionPayload> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeApi for FakeBackend {
    async fn fetch_challenge(
        &self,
        access_code: &str,
        participant_cookie: Option<&str>,
    ) -> Result<ChallengeEnvelope> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.last_cookie.lock().unwrap() = participant_cookie.map(str::to_string);
        if access_code != "ROOM42" {
            return Err(SessionError::NotFound(access_code.to_string()));
        }
        let participant = self.participant.lock().unwrap().clone();
        // The server only recognises the participant when the cookie matches.
        let recognised = participant.filter(|p| {
            participant_cookie == Some(format!("lc_participant_ROOM42={}", p.id).as_str())
        });
        Ok(ChallengeEnvelope {
            challenge: self.challenge.lock().unwrap().clone(),
            teams: vec![
                Team {
                    id: "3".into(),
                    name: "Green".into(),
                    member_count: 1,
                },
                Team {
                    id: "4".into(),
                    name: "Orange".into(),
                    member_count: 3,
                },
            ],
            joined: recognised.is_some(),
            submission: recognised
                .as_ref()
                .map(|_| self.submission.lock().unwrap().clone().unwrap_or_default()),
            participant: recognised,
        })
    }

    async fn join(&self, _access_code: &str, team_id: &str) -> Result<Participant> {
        if team_id == "4" {
            return Err(SessionError::Http {
                status: 409,
                url: "fake://challenges/ROOM42".into(),
                message: Some("Team Orange is full".into()),
            });
        }
        let p = Participant {
            id: "501".into(),
            challenge_id: "12".into(),
            team_id: team_id.to_string(),
            team_name: "Green".into(),
        };
        *self.participant.lock().unwrap() = Some(p.clone());
        Ok(p)
    }

    async fn save_submission(&self, payload: &SubmissionPayload) -> Result<()> {
        *self.submission.lock().unwrap() = Some(SavedSubmission {
            html_code: payload.html_code.clone(),
            css_code: payload.css_code.clone(),
        });
        self.saves.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn ping_activity(&self, _ping: &ActivityPing) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
