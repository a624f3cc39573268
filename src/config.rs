//! Client configuration.
//!
//! Loaded from an optional TOML file; a handful of environment variables
//! override the file so the binary can be pointed at another backend without
//! editing anything on disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SessionError};

pub const ENV_BASE_URL: &str = "LIVECODE_BASE_URL";
pub const ENV_COOKIE_FILE: &str = "LIVECODE_COOKIE_FILE";
pub const ENV_REQUEST_TIMEOUT: &str = "LIVECODE_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    /// Root of the live-coding API. Default: "http://localhost:3000/api/live-coding".
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// TCP connect timeout in seconds. Default: 3.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Per-request timeout in seconds. Default: 10.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Quiet period after the last edit before an autosave fires. Default: 2000.
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
    /// Countdown tick. Default: 1000.
    #[serde(default = "default_countdown_tick_ms")]
    pub countdown_tick_ms: u64,
    /// Activity ping interval. Default: 30.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// How often the CLI re-fetches challenge status. Default: 15.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Upper bound on the autocomplete popup length. Default: 8.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Where the participant cookie jar is persisted. The CLI falls back to
    /// `.livecode-cookies.json` in the working directory.
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    /// Participant cookie lifetime. Default: 24.
    #[serde(default = "default_cookie_max_age_hours")]
    pub cookie_max_age_hours: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api/live-coding".into()
}
fn default_connect_timeout_secs() -> u64 {
    3
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_autosave_debounce_ms() -> u64 {
    2_000
}
fn default_countdown_tick_ms() -> u64 {
    1_000
}
fn default_heartbeat_interval_secs() -> u64 {
    30
}
fn default_refresh_interval_secs() -> u64 {
    15
}
fn default_max_suggestions() -> usize {
    8
}
fn default_cookie_max_age_hours() -> u64 {
    24
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            autosave_debounce_ms: default_autosave_debounce_ms(),
            countdown_tick_ms: default_countdown_tick_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            max_suggestions: default_max_suggestions(),
            cookie_file: None,
            cookie_max_age_hours: default_cookie_max_age_hours(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Load from `path` when given (the file must exist), then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| {
                    SessionError::Config(format!("cannot read {}: {e}", p.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a variable lookup (injectable for tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(file) = lookup(ENV_COOKIE_FILE) {
            self.cookie_file = Some(PathBuf::from(file));
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = raw.trim().parse().map_err(|_| {
                SessionError::Config(format!("{ENV_REQUEST_TIMEOUT} must be an integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(SessionError::Config("base_url must not be empty".into()));
        }
        let intervals = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("autosave_debounce_ms", self.autosave_debounce_ms),
            ("countdown_tick_ms", self.countdown_tick_ms),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("refresh_interval_secs", self.refresh_interval_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(SessionError::Config(format!("{name} must be greater than zero")));
        }
        if self.max_suggestions == 0 {
            return Err(SessionError::Config("max_suggestions must be at least 1".into()));
        }
        Ok(())
    }

    /// `base_url` without a trailing slash, ready for path joining.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cookie_max_age(&self) -> Duration {
        Duration::from_secs(self.cookie_max_age_hours * 3_600)
    }
}
