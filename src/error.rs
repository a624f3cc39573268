//! Crate-level error type.
//!
//! Transport failures keep the shape of the HTTP bridge errors (status + url,
//! connect detail, JSON field detail) so a log line is enough to diagnose the
//! failing call. Session-level variants describe why a state transition was
//! refused.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The remote server replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}{}", message_suffix(.message))]
    Http {
        status: u16,
        url: String,
        /// `error` / `message` text from the response body, when present.
        message: Option<String>,
    },

    /// Response body could not be parsed as the expected JSON structure.
    #[error("JSON parse error on field '{field}': {detail}")]
    Json { field: String, detail: String },

    /// A TCP-level connection could not be established.
    #[error("Connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The access code does not name a challenge.
    #[error("challenge '{0}' not found")]
    NotFound(String),

    /// A join request for this session is already on the wire.
    #[error("a join request is already in flight")]
    JoinInFlight,

    #[error("already joined this challenge")]
    AlreadyJoined,

    /// The operation needs a participant and none exists yet.
    #[error("not joined to a challenge")]
    NotJoined,

    /// The challenge is not active or an administrator locked editing.
    #[error("editing is locked for this challenge")]
    EditingLocked,

    /// The background task owning this operation has been shut down.
    #[error("session task stopped")]
    Stopped,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl SessionError {
    /// Message suitable for showing inline to the participant.
    ///
    /// Prefers the server-provided text over the transport framing.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Http {
                message: Some(m), ..
            } => m.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Json {
            field: "body".into(),
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_display_includes_status_and_url() {
        let err = SessionError::Http {
            status: 503,
            url: "http://localhost:3000/api/live-coding/submissions".to_string(),
            message: None,
        };
        let s = err.to_string();
        assert!(s.contains("503"), "expected status in display: {s}");
        assert!(s.contains("/submissions"), "expected url: {s}");
    }

    #[test]
    fn http_display_appends_server_message() {
        let err = SessionError::Http {
            status: 409,
            url: "http://x/challenges/ABC".to_string(),
            message: Some("Team is full".to_string()),
        };
        assert!(err.to_string().ends_with(": Team is full"));
    }

    #[test]
    fn user_message_prefers_server_text() {
        let err = SessionError::Http {
            status: 409,
            url: "http://x".to_string(),
            message: Some("Team is full".to_string()),
        };
        assert_eq!(err.user_message(), "Team is full");
    }

    #[test]
    fn user_message_falls_back_to_display() {
        let err = SessionError::NotFound("ZZZ".to_string());
        assert_eq!(err.user_message(), "challenge 'ZZZ' not found");
    }

    #[test]
    fn json_error_converts_from_serde() {
        let e = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: SessionError = e.into();
        assert!(matches!(err, SessionError::Json { ref field, .. } if field == "body"));
    }

    #[test]
    fn session_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&SessionError::JoinInFlight);
    }
}
