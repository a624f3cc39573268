//! HTTP client for the live-coding backend.
//!
//! [`ChallengeApi`] is the seam the rest of the crate talks to; the
//! [`HttpChallengeApi`] implementation maps it onto the four REST endpoints:
//!
//! | call              | request                               |
//! |-------------------|---------------------------------------|
//! | `fetch_challenge` | `GET  {base}/challenges/{code}`       |
//! | `join`            | `POST {base}/challenges/{code}`       |
//! | `save_submission` | `POST {base}/submissions`             |
//! | `ping_activity`   | `POST {base}/activity`                |

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::models::{
    ActivityPing, ChallengeEnvelope, ErrorBody, JoinRequest, JoinResponse, Participant,
    SubmissionPayload,
};

/// Operations this client needs from the backend.
#[async_trait]
pub trait ChallengeApi: Send + Sync {
    /// Fetch challenge, teams and (if known) the caller's participant.
    ///
    /// `participant_cookie` is the `name=value` pair from the cookie jar, sent
    /// so the server can recognise a returning participant.
    async fn fetch_challenge(
        &self,
        access_code: &str,
        participant_cookie: Option<&str>,
    ) -> Result<ChallengeEnvelope>;

    /// Register a participant against `team_id`.
    async fn join(&self, access_code: &str, team_id: &str) -> Result<Participant>;

    /// Persist both buffers as one submission.
    async fn save_submission(&self, payload: &SubmissionPayload) -> Result<()>;

    /// Heartbeat.
    async fn ping_activity(&self, ping: &ActivityPing) -> Result<()>;
}

/// reqwest-backed [`ChallengeApi`]. Use [`HttpChallengeApi::builder`].
#[derive(Debug, Clone)]
pub struct HttpChallengeApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpChallengeApi {
    pub fn builder(base_url: impl Into<String>) -> HttpChallengeApiBuilder {
        HttpChallengeApiBuilder::new(base_url)
    }

    /// Build from a loaded [`ClientConfig`].
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::builder(cfg.api_root())
            .connect_timeout(cfg.connect_timeout())
            .request_timeout(cfg.request_timeout())
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// The access code is user input; escape it as one path segment.
    fn challenge_url(&self, access_code: &str) -> String {
        self.url(&format!("challenges/{}", urlencoding::encode(access_code)))
    }

    async fn send(&self, req: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let resp = req.send().await.map_err(|e| SessionError::Connect {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        // Best effort: the body may be empty or not JSON at all.
        let message = resp
            .bytes()
            .await
            .ok()
            .and_then(|b| serde_json::from_slice::<ErrorBody>(&b).ok())
            .and_then(ErrorBody::text);

        Err(SessionError::Http {
            status: status.as_u16(),
            url: url.to_string(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response, field: &str) -> Result<T> {
        let bytes = resp.bytes().await.map_err(|e| SessionError::Json {
            field: field.into(),
            detail: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| SessionError::Json {
            field: field.into(),
            detail: e.to_string(),
        })
    }

    async fn post_ack<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        self.send(self.client.post(&url).json(body), &url).await?;
        Ok(())
    }
}

#[async_trait]
impl ChallengeApi for HttpChallengeApi {
    async fn fetch_challenge(
        &self,
        access_code: &str,
        participant_cookie: Option<&str>,
    ) -> Result<ChallengeEnvelope> {
        let url = self.challenge_url(access_code);
        let mut req = self.client.get(&url);
        if let Some(cookie) = participant_cookie {
            req = req.header(reqwest::header::COOKIE, cookie);
        }
        match self.send(req, &url).await {
            Ok(resp) => Self::decode(resp, "challenge").await,
            Err(SessionError::Http { status: 404, .. }) => {
                Err(SessionError::NotFound(access_code.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn join(&self, access_code: &str, team_id: &str) -> Result<Participant> {
        let url = self.challenge_url(access_code);
        let body = JoinRequest {
            team_id: team_id.to_string(),
        };
        let resp = self.send(self.client.post(&url).json(&body), &url).await?;
        let joined: JoinResponse = Self::decode(resp, "participant").await?;
        Ok(joined.participant)
    }

    async fn save_submission(&self, payload: &SubmissionPayload) -> Result<()> {
        self.post_ack("submissions", payload).await
    }

    async fn ping_activity(&self, ping: &ActivityPing) -> Result<()> {
        self.post_ack("activity", ping).await
    }
}

/// Builder for [`HttpChallengeApi`].
pub struct HttpChallengeApiBuilder {
    base_url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl HttpChallengeApiBuilder {
    /// Defaults: connect 3 s, request 10 s.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> HttpChallengeApi {
        // Builder failure only happens when the TLS backend cannot initialise;
        // fall back to a default client rather than panicking.
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .unwrap_or_default();

        HttpChallengeApi {
            base_url: self.base_url,
            client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_trailing_slash() {
        let api = HttpChallengeApi::builder("http://localhost:3000/api/live-coding/").build();
        assert_eq!(api.base_url(), "http://localhost:3000/api/live-coding");
    }

    #[test]
    fn url_joins_paths() {
        let api = HttpChallengeApi::builder("http://h/api").build();
        assert_eq!(api.url("challenges/ABC123"), "http://h/api/challenges/ABC123");
        assert_eq!(api.url("/submissions"), "http://h/api/submissions");
    }

    #[test]
    fn access_code_is_one_escaped_segment() {
        let api = HttpChallengeApi::builder("http://h/api").build();
        assert_eq!(api.challenge_url("ABC123"), "http://h/api/challenges/ABC123");
        assert_eq!(
            api.challenge_url("../admin?x=1"),
            "http://h/api/challenges/..%2Fadmin%3Fx%3D1"
        );
    }

    #[test]
    fn from_config_uses_api_root() {
        let cfg = ClientConfig {
            base_url: "http://cfg.example/api/".into(),
            ..Default::default()
        };
        let api = HttpChallengeApi::from_config(&cfg);
        assert_eq!(api.base_url(), "http://cfg.example/api");
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_connect_error() {
        // Port 9 (discard) on localhost is almost never listening.
        let api = HttpChallengeApi::builder("http://127.0.0.1:9")
            .connect_timeout(Duration::from_millis(200))
            .request_timeout(Duration::from_millis(500))
            .build();
        let err = api.fetch_challenge("ABC", None).await.unwrap_err();
        assert!(
            matches!(err, SessionError::Connect { ref url, .. } if url.ends_with("/challenges/ABC")),
            "unexpected error: {err:?}"
        );
    }
}
