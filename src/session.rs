//! # Challenge session
//!
//! ## Responsibility
//! Loads a challenge by access code and walks the participant through the
//! join flow:
//!
//! ```text
//! Loading ──► Error
//!    │
//!    ├──► NotJoined ──join──► Joined
//!    └──────────────────────► Joined
//! ```
//!
//! `Joined` is terminal. A failed join stays in `NotJoined` with the server's
//! message attached so the picker can show it inline.
//!
//! ## Concurrency
//! The state lives behind a std mutex that is never held across an await.
//! Joins are serialised by an atomic in-flight flag: a second join while the
//! first is on the wire is refused before any network call is made.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::api::ChallengeApi;
use crate::clock::SharedClock;
use crate::cookie::CookieJar;
use crate::error::{Result, SessionError};
use crate::models::{Challenge, Participant, SavedSubmission, Team};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    Error {
        message: String,
    },
    NotJoined {
        challenge: Challenge,
        teams: Vec<Team>,
        join_error: Option<String>,
    },
    Joined {
        challenge: Challenge,
        teams: Vec<Team>,
        participant: Participant,
    },
}

impl SessionState {
    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            SessionState::NotJoined { challenge, .. } | SessionState::Joined { challenge, .. } => {
                Some(challenge)
            }
            _ => None,
        }
    }

    pub fn participant(&self) -> Option<&Participant> {
        match self {
            SessionState::Joined { participant, .. } => Some(participant),
            _ => None,
        }
    }

    pub fn is_joined(&self) -> bool {
        matches!(self, SessionState::Joined { .. })
    }
}

/// Clears the in-flight flag on every exit path of `join`.
struct JoinGuard<'a>(&'a AtomicBool);

impl Drop for JoinGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChallengeSession {
    api: Arc<dyn ChallengeApi>,
    cookies: Arc<CookieJar>,
    clock: SharedClock,
    access_code: String,
    state: Mutex<SessionState>,
    joining: AtomicBool,
}

impl ChallengeSession {
    pub fn new(
        api: Arc<dyn ChallengeApi>,
        cookies: Arc<CookieJar>,
        clock: SharedClock,
        access_code: impl Into<String>,
    ) -> Self {
        Self {
            api,
            cookies,
            clock,
            access_code: access_code.into(),
            state: Mutex::new(SessionState::Loading),
            joining: AtomicBool::new(false),
        }
    }

    pub fn access_code(&self) -> &str {
        &self.access_code
    }

    pub fn state(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn is_joining(&self) -> bool {
        self.joining.load(Ordering::Acquire)
    }

    /// Fetch the challenge, presenting the stored participant cookie.
    ///
    /// Returns the saved submission when the server recognises the caller as
    /// an existing participant.
    pub async fn load(&self) -> Result<Option<SavedSubmission>> {
        self.set_state(SessionState::Loading);

        let now = self.clock.now_ms();
        let cookie = self.cookies.get(&self.access_code, now).map(|c| c.pair());
        let envelope = match self
            .api
            .fetch_challenge(&self.access_code, cookie.as_deref())
            .await
        {
            Ok(env) => env,
            Err(e) => {
                warn!(access_code = %self.access_code, error = %e, "challenge load failed");
                self.set_state(SessionState::Error {
                    message: e.user_message(),
                });
                return Err(e);
            }
        };

        match (envelope.joined, envelope.participant) {
            (true, Some(participant)) => {
                self.cookies
                    .set(&self.access_code, &participant.id, self.clock.now_ms());
                info!(
                    access_code = %self.access_code,
                    participant_id = %participant.id,
                    "resumed existing participant"
                );
                self.set_state(SessionState::Joined {
                    challenge: envelope.challenge,
                    teams: envelope.teams,
                    participant,
                });
                Ok(envelope.submission)
            }
            (true, None) => {
                let e = SessionError::Json {
                    field: "participant".into(),
                    detail: "joined=true without a participant".into(),
                };
                self.set_state(SessionState::Error {
                    message: e.user_message(),
                });
                Err(e)
            }
            (false, _) => {
                if cookie.is_some() {
                    debug!(access_code = %self.access_code, "server ignored stale participant cookie");
                    self.cookies.remove(&self.access_code, self.clock.now_ms());
                }
                self.set_state(SessionState::NotJoined {
                    challenge: envelope.challenge,
                    teams: envelope.teams,
                    join_error: None,
                });
                Ok(None)
            }
        }
    }

    /// Join `team_id`.
    ///
    /// # Errors
    /// - [`SessionError::JoinInFlight`] while another join is running.
    /// - [`SessionError::AlreadyJoined`] / [`SessionError::NotJoined`] when
    ///   the session is not waiting for a team choice.
    /// - The API error when the server refuses; the state keeps the message.
    pub async fn join(&self, team_id: &str) -> Result<Participant> {
        if self
            .joining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(access_code = %self.access_code, "join ignored, one is already in flight");
            return Err(SessionError::JoinInFlight);
        }
        let _guard = JoinGuard(&self.joining);

        match &*self.lock() {
            SessionState::NotJoined { .. } => {}
            SessionState::Joined { .. } => return Err(SessionError::AlreadyJoined),
            _ => return Err(SessionError::NotJoined),
        }

        match self.api.join(&self.access_code, team_id).await {
            Ok(participant) => {
                self.cookies
                    .set(&self.access_code, &participant.id, self.clock.now_ms());
                info!(
                    access_code = %self.access_code,
                    participant_id = %participant.id,
                    team = %participant.team_name,
                    "joined challenge"
                );
                let mut state = self.lock();
                let (challenge, teams) = match std::mem::replace(&mut *state, SessionState::Loading)
                {
                    SessionState::NotJoined {
                        challenge, teams, ..
                    } => (challenge, teams),
                    other => {
                        // Only join() leaves NotJoined and it is serialised.
                        *state = other;
                        return Err(SessionError::NotJoined);
                    }
                };
                *state = SessionState::Joined {
                    challenge,
                    teams,
                    participant: participant.clone(),
                };
                Ok(participant)
            }
            Err(e) => {
                warn!(access_code = %self.access_code, team_id, error = %e, "join failed");
                if let SessionState::NotJoined { join_error, .. } = &mut *self.lock() {
                    *join_error = Some(e.user_message());
                }
                Err(e)
            }
        }
    }

    /// Re-fetch challenge metadata (status, lock, deadline).
    ///
    /// Never moves a session out of `Joined`; errors leave the state as is.
    pub async fn refresh(&self) -> Result<Challenge> {
        let now = self.clock.now_ms();
        let cookie = self.cookies.get(&self.access_code, now).map(|c| c.pair());
        let envelope = self
            .api
            .fetch_challenge(&self.access_code, cookie.as_deref())
            .await?;

        let mut state = self.lock();
        match &mut *state {
            SessionState::Joined {
                challenge, teams, ..
            }
            | SessionState::NotJoined {
                challenge, teams, ..
            } => {
                if challenge.status != envelope.challenge.status
                    || challenge.is_editing_locked != envelope.challenge.is_editing_locked
                {
                    info!(
                        access_code = %self.access_code,
                        status = %envelope.challenge.status,
                        locked = envelope.challenge.is_editing_locked,
                        "challenge changed"
                    );
                }
                *challenge = envelope.challenge.clone();
                *teams = envelope.teams;
            }
            _ => {}
        }
        Ok(envelope.challenge)
    }

    fn set_state(&self, next: SessionState) {
        *self.lock() = next;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::ChallengeStatus;
    use crate::test_support::{challenge, envelope, MockApi};
    use std::time::Duration;

    const NOW: i64 = 1_760_000_000_000;
    const DAY: Duration = Duration::from_secs(86_400);

    fn session(api: Arc<MockApi>, jar: Arc<CookieJar>) -> Arc<ChallengeSession> {
        Arc::new(ChallengeSession::new(api, jar, ManualClock::new(NOW), "ABC123"))
    }

    fn not_joined_api() -> Arc<MockApi> {
        Arc::new(MockApi::with_envelope(envelope(
            challenge(ChallengeStatus::Active),
            false,
        )))
    }

    #[tokio::test]
    async fn unknown_code_is_error_state() {
        let api = Arc::new(MockApi::default());
        let s = session(api, Arc::new(CookieJar::in_memory(DAY)));
        let err = s.load().await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
        assert!(matches!(s.state(), SessionState::Error { .. }));
    }

    #[tokio::test]
    async fn not_joined_lists_teams() {
        let s = session(not_joined_api(), Arc::new(CookieJar::in_memory(DAY)));
        assert_eq!(s.load().await.unwrap(), None);
        match s.state() {
            SessionState::NotJoined {
                teams, join_error, ..
            } => {
                assert_eq!(teams.len(), 2);
                assert!(join_error.is_none());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn joined_load_hydrates_and_refreshes_cookie() {
        let api = Arc::new(MockApi::with_envelope(envelope(
            challenge(ChallengeStatus::Active),
            true,
        )));
        let jar = Arc::new(CookieJar::in_memory(DAY));
        jar.set("ABC123", "99", NOW - 1_000);
        let s = session(api.clone(), jar.clone());

        let saved = s.load().await.unwrap().unwrap();
        assert_eq!(saved.html_code, "<h1>saved</h1>");
        assert!(s.state().is_joined());
        assert_eq!(
            api.cookies_seen(),
            vec![Some("lc_participant_ABC123=99".to_string())]
        );
        assert_eq!(jar.get("ABC123", NOW).unwrap().expires_at_ms, NOW + 86_400_000);
    }

    #[tokio::test]
    async fn stale_cookie_is_dropped_when_server_disagrees() {
        let jar = Arc::new(CookieJar::in_memory(DAY));
        jar.set("ABC123", "12", NOW);
        let s = session(not_joined_api(), jar.clone());
        s.load().await.unwrap();
        assert!(jar.get("ABC123", NOW).is_none());
    }

    #[tokio::test]
    async fn join_success_sets_cookie_and_state() {
        let jar = Arc::new(CookieJar::in_memory(DAY));
        let s = session(not_joined_api(), jar.clone());
        s.load().await.unwrap();

        let p = s.join("2").await.unwrap();
        assert_eq!(p.team_id, "2");
        assert_eq!(jar.participant_id("ABC123", NOW).as_deref(), Some("99"));
        assert_eq!(s.state().participant().map(|p| p.id.as_str()), Some("99"));
        assert!(!s.is_joining());
    }

    #[tokio::test]
    async fn join_failure_stays_not_joined_with_message() {
        let api = not_joined_api();
        api.fail_joins(409, "Team is full");
        let s = session(api.clone(), Arc::new(CookieJar::in_memory(DAY)));
        s.load().await.unwrap();

        assert!(s.join("1").await.is_err());
        match s.state() {
            SessionState::NotJoined { join_error, .. } => {
                assert_eq!(join_error.as_deref(), Some("Team is full"));
            }
            other => panic!("unexpected state {other:?}"),
        }

        // Retry is allowed once the flag is released.
        api.clear_join_failure();
        assert!(s.join("2").await.is_ok());
    }

    #[tokio::test]
    async fn second_join_while_in_flight_makes_no_request() {
        let api = not_joined_api();
        let release = api.hold_joins();
        let s = session(api.clone(), Arc::new(CookieJar::in_memory(DAY)));
        s.load().await.unwrap();

        let first = {
            let s = s.clone();
            tokio::spawn(async move { s.join("1").await })
        };
        while !s.is_joining() || api.join_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let err = s.join("1").await.unwrap_err();
        assert!(matches!(err, SessionError::JoinInFlight));
        assert_eq!(api.join_calls.load(Ordering::SeqCst), 1);

        release.notify_one();
        first.await.unwrap().unwrap();
        assert!(s.state().is_joined());
    }

    #[tokio::test]
    async fn join_after_joined_is_refused() {
        let s = session(not_joined_api(), Arc::new(CookieJar::in_memory(DAY)));
        s.load().await.unwrap();
        s.join("1").await.unwrap();
        assert!(matches!(
            s.join("1").await.unwrap_err(),
            SessionError::AlreadyJoined
        ));
    }

    #[tokio::test]
    async fn join_before_load_is_refused() {
        let api = not_joined_api();
        let s = session(api.clone(), Arc::new(CookieJar::in_memory(DAY)));
        assert!(matches!(s.join("1").await.unwrap_err(), SessionError::NotJoined));
        assert_eq!(api.join_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_picks_up_lock_and_stays_joined() {
        let api = Arc::new(MockApi::with_envelope(envelope(
            challenge(ChallengeStatus::Active),
            true,
        )));
        let s = session(api.clone(), Arc::new(CookieJar::in_memory(DAY)));
        s.load().await.unwrap();

        api.update_challenge(|c| c.is_editing_locked = true);
        let c = s.refresh().await.unwrap();
        assert!(c.is_editing_locked);
        let state = s.state();
        assert!(state.is_joined());
        assert!(!state.challenge().unwrap().is_editable());
    }

    #[tokio::test]
    async fn refresh_error_keeps_state() {
        let api = Arc::new(MockApi::with_envelope(envelope(
            challenge(ChallengeStatus::Active),
            true,
        )));
        let s = session(api.clone(), Arc::new(CookieJar::in_memory(DAY)));
        s.load().await.unwrap();
        api.set_envelope(None);
        assert!(s.refresh().await.is_err());
        assert!(s.state().is_joined());
    }
}
