//! Wire and domain types for the live-coding API.
//!
//! Challenge, team and participant records come from the backend in
//! snake_case; request bodies go out in camelCase. Identifiers are accepted as
//! either JSON numbers or strings and normalised to `String`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identifier normalisation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

fn de_id<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(d).map(String::from)
}

fn de_null_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// Lifecycle of a challenge as set by the admin side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    #[default]
    Upcoming,
    Active,
    Closed,
    /// Anything the server sends that this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ChallengeStatus {
    pub fn is_active(self) -> bool {
        self == ChallengeStatus::Active
    }
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeStatus::Upcoming => write!(f, "upcoming"),
            ChallengeStatus::Active => write!(f, "active"),
            ChallengeStatus::Closed => write!(f, "closed"),
            ChallengeStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub description: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub instructions: String,
    #[serde(default)]
    pub status: ChallengeStatus,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    /// Authoritative deadline as sent by the server. Parse with
    /// [`Challenge::end_time_utc`].
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_editing_locked: bool,
}

impl Challenge {
    /// Editing is only possible while the challenge runs and is not locked.
    pub fn is_editable(&self) -> bool {
        self.status.is_active() && !self.is_editing_locked
    }

    /// The parsed `end_time`, or `None` when absent or unparseable.
    pub fn end_time_utc(&self) -> Option<DateTime<Utc>> {
        self.end_time.as_deref().and_then(parse_timestamp)
    }
}

/// Parse RFC 3339, or a naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Team / participant / submission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub member_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub challenge_id: String,
    #[serde(deserialize_with = "de_id")]
    pub team_id: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub team_name: String,
}

/// Buffers previously saved by this participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedSubmission {
    #[serde(default, alias = "htmlCode", deserialize_with = "de_null_string")]
    pub html_code: String,
    #[serde(default, alias = "cssCode", deserialize_with = "de_null_string")]
    pub css_code: String,
}

// ---------------------------------------------------------------------------
// Request / response envelopes
// ---------------------------------------------------------------------------

/// `GET /challenges/{code}`
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeEnvelope {
    pub challenge: Challenge,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub joined: bool,
    #[serde(default)]
    pub participant: Option<Participant>,
    #[serde(default)]
    pub submission: Option<SavedSubmission>,
}

/// `POST /challenges/{code}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub team_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinResponse {
    pub participant: Participant,
}

/// `POST /submissions`. Always carries both buffers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub challenge_id: String,
    pub participant_id: String,
    pub html_code: String,
    pub css_code: String,
}

/// `POST /activity`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPing {
    pub participant_id: String,
    pub challenge_id: String,
}

/// Error body shape used by the backend on non-2xx replies.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn text(self) -> Option<String> {
        self.error.or(self.message).filter(|s| !s.trim().is_empty())
    }
}
