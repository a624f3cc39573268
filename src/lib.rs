//! Headless client for live-coding challenge sessions.
//!
//! A participant opens a challenge by access code, joins a team and edits an
//! HTML and a CSS buffer while the challenge runs. This crate holds the
//! client side of that flow:
//!
//! - [`session`]: load by access code and the join state machine.
//! - [`editor`]: the two buffers with tag/property autocomplete.
//! - [`countdown`], [`autosave`], [`heartbeat`]: the background services of
//!   an active session.
//! - [`focus`]: the tab-switch and shortcut policy.
//! - [`controller`]: [`LiveCodingSession`], which wires all of the above.
//!
//! Browser events are plain values ([`keys::KeyCombo`],
//! [`focus::FocusEvent`]) that the host feeds in.

pub mod api;
pub mod autosave;
pub mod cli;
pub mod clock;
pub mod config;
pub mod controller;
pub mod cookie;
pub mod countdown;
pub mod editor;
pub mod error;
pub mod focus;
pub mod heartbeat;
pub mod keys;
pub mod models;
pub mod session;

#[cfg(test)]
mod test_support;

pub use api::{ChallengeApi, HttpChallengeApi};
pub use autosave::SaveStatus;
pub use config::ClientConfig;
pub use controller::LiveCodingSession;
pub use cookie::CookieJar;
pub use editor::{ActiveTab, Editor, Grammar};
pub use error::{Result, SessionError};
pub use session::{ChallengeSession, SessionState};
