//! Participant cookie jar.
//!
//! One cookie per challenge access code holds the participant id so that a
//! reload resumes the same participant instead of joining again. It is a
//! cache hint; the server still decides whether the caller has joined.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

pub const COOKIE_PREFIX: &str = "lc_participant_";
pub const COOKIE_PATH: &str = "/";

/// Cookie name for `access_code`, escaped so separators in the code cannot
/// break the `Cookie:` header.
pub fn cookie_name(access_code: &str) -> String {
    format!("{COOKIE_PREFIX}{}", urlencoding::encode(access_code))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// Unix epoch milliseconds.
    pub expires_at_ms: i64,
}

impl StoredCookie {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// `name=value`, for a `Cookie:` request header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }

    /// The equivalent `Set-Cookie` line.
    pub fn set_cookie_line(&self) -> String {
        let expires = chrono::DateTime::from_timestamp_millis(self.expires_at_ms)
            .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
            .unwrap_or_default();
        format!("{}; path={}; expires={}", self.pair(), self.path, expires)
    }
}

/// Thread-safe jar, optionally mirrored to a JSON file.
#[derive(Debug)]
pub struct CookieJar {
    entries: Mutex<HashMap<String, StoredCookie>>,
    max_age: Duration,
    file: Option<PathBuf>,
}

impl CookieJar {
    /// A jar that lives only as long as the process.
    pub fn in_memory(max_age: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_age,
            file: None,
        }
    }

    /// Open (or start) a jar persisted at `path`. A missing file is empty.
    pub fn open(path: impl AsRef<Path>, max_age: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => {
                let list: Vec<StoredCookie> = serde_json::from_slice(&bytes)?;
                list.into_iter().map(|c| (c.name.clone(), c)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            entries: Mutex::new(entries),
            max_age,
            file: Some(path),
        })
    }

    /// Participant id stored for `access_code`, if present and unexpired.
    pub fn get(&self, access_code: &str, now_ms: i64) -> Option<StoredCookie> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .get(&cookie_name(access_code))
            .filter(|c| !c.is_expired(now_ms))
            .cloned()
    }

    pub fn participant_id(&self, access_code: &str, now_ms: i64) -> Option<String> {
        self.get(access_code, now_ms).map(|c| c.value)
    }

    /// Store `participant_id` for `access_code`, replacing any previous value.
    pub fn set(&self, access_code: &str, participant_id: &str, now_ms: i64) -> StoredCookie {
        let cookie = StoredCookie {
            name: cookie_name(access_code),
            value: participant_id.to_string(),
            path: COOKIE_PATH.to_string(),
            expires_at_ms: now_ms.saturating_add(self.max_age.as_millis() as i64),
        };
        {
            let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            guard.insert(cookie.name.clone(), cookie.clone());
        }
        if let Err(e) = self.persist(now_ms) {
            warn!(error = %e, "failed to persist participant cookie jar");
        }
        cookie
    }

    pub fn remove(&self, access_code: &str, now_ms: i64) {
        {
            let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            guard.remove(&cookie_name(access_code));
        }
        if let Err(e) = self.persist(now_ms) {
            warn!(error = %e, "failed to persist participant cookie jar");
        }
    }

    /// Write unexpired entries to the backing file, if any.
    pub fn persist(&self, now_ms: i64) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let mut list: Vec<StoredCookie> = {
            let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            guard.values().filter(|c| !c.is_expired(now_ms)).cloned().collect()
        };
        list.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(&list)?)?;
        Ok(())
    }
}
