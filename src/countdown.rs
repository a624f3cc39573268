//! # Countdown
//!
//! Remaining time is recomputed from the wall clock on every tick rather
//! than decremented, so missed ticks (suspended tab, sleeping laptop) never
//! accumulate error.
//!
//! ## Deadline sources
//! - `end_time` present and parseable → [`Deadline::Absolute`], ticks.
//! - otherwise `duration_minutes` → [`Deadline::Fixed`], a display-only value
//!   that never counts down. It is not a real deadline.
//! - neither → [`Deadline::Unknown`], renders as `--:--`.
//!
//! The countdown is advisory. The server enforces the real deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::clock::SharedClock;
use crate::models::Challenge;

/// Below this many seconds the display switches to its urgent style.
pub const URGENT_THRESHOLD_SECS: u64 = 60;

pub const PLACEHOLDER: &str = "--:--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Unix epoch milliseconds.
    Absolute(i64),
    /// Display-only fallback in seconds.
    Fixed(u64),
    Unknown,
}

impl Deadline {
    pub fn resolve(end_time: Option<&str>, duration_minutes: Option<u32>) -> Self {
        if let Some(end) = end_time.and_then(crate::models::parse_timestamp) {
            return Deadline::Absolute(end.timestamp_millis());
        }
        match duration_minutes {
            Some(m) => Deadline::Fixed(u64::from(m) * 60),
            None => Deadline::Unknown,
        }
    }

    pub fn for_challenge(challenge: &Challenge) -> Self {
        Self::resolve(challenge.end_time.as_deref(), challenge.duration_minutes)
    }

    /// Only absolute deadlines count down.
    pub fn is_live(&self) -> bool {
        matches!(self, Deadline::Absolute(_))
    }

    /// Whole seconds left at `now_ms`.
    pub fn remaining_at(&self, now_ms: i64) -> Option<u64> {
        match *self {
            Deadline::Absolute(end) => Some((end.saturating_sub(now_ms)).max(0) as u64 / 1_000),
            Deadline::Fixed(secs) => Some(secs),
            Deadline::Unknown => None,
        }
    }
}

/// `mm:ss`, zero padded. Minutes are not wrapped into hours.
pub fn format_remaining(remaining: Option<u64>) -> String {
    match remaining {
        Some(secs) => format!("{:02}:{:02}", secs / 60, secs % 60),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn is_urgent(remaining: Option<u64>) -> bool {
    matches!(remaining, Some(s) if s < URGENT_THRESHOLD_SECS)
}

/// A running countdown. Dropping it stops the tick task.
pub struct Countdown {
    deadline: Deadline,
    clock: SharedClock,
    tick: Duration,
    tx: Arc<watch::Sender<Option<u64>>>,
    rx: watch::Receiver<Option<u64>>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("deadline", &self.deadline)
            .field("remaining", &self.remaining())
            .finish()
    }
}

impl Countdown {
    /// Publish the first value immediately; tick only for live deadlines,
    /// stopping once zero is reached.
    pub fn start(deadline: Deadline, clock: SharedClock, tick: Duration) -> Self {
        let (tx, rx) = watch::channel(deadline.remaining_at(clock.now_ms()));
        let mut countdown = Self {
            deadline,
            clock,
            tick,
            tx: Arc::new(tx),
            rx,
            task: None,
        };
        countdown.spawn_ticker();
        countdown
    }

    /// Count down to a new deadline on the same channel, so existing
    /// subscribers keep receiving values.
    pub fn retarget(&mut self, deadline: Deadline) {
        self.stop();
        self.deadline = deadline;
        self.tx
            .send_replace(deadline.remaining_at(self.clock.now_ms()));
        self.spawn_ticker();
    }

    fn spawn_ticker(&mut self) {
        if !self.deadline.is_live() {
            return;
        }
        let deadline = self.deadline;
        let clock = self.clock.clone();
        let tx = self.tx.clone();
        let tick = self.tick;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let remaining = deadline.remaining_at(clock.now_ms());
                tx.send_replace(remaining);
                if remaining == Some(0) {
                    debug!("countdown reached zero");
                    break;
                }
            }
        }));
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Latest published value.
    pub fn remaining(&self) -> Option<u64> {
        *self.rx.borrow()
    }

    pub fn display(&self) -> String {
        format_remaining(self.remaining())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
