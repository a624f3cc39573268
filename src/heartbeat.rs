//! Activity heartbeat.
//!
//! Pings `POST /activity` on a fixed interval while the session is active.
//! Fire-and-forget: failures are logged at debug and the next tick tries
//! again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::ChallengeApi;
use crate::models::ActivityPing;

pub struct Heartbeat {
    task: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// First ping goes out immediately, then one per `interval`.
    pub fn start(api: Arc<dyn ChallengeApi>, ping: ActivityPing, interval: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut consecutive_failures: u32 = 0;
            loop {
                ticker.tick().await;
                match api.ping_activity(&ping).await {
                    Ok(()) => consecutive_failures = 0,
                    Err(e) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        debug!(
                            error = %e,
                            participant_id = %ping.participant_id,
                            consecutive_failures,
                            "activity ping failed, will retry next tick"
                        );
                    }
                }
            }
        });
        Self { task: Some(task) }
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

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
