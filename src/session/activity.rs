use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SessionManager;
use crate::crypto::PasswordHasher;
use crate::{LOG_TARGET, LoginAuditRepository, UserRepository};

const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// User input that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionSignal {
    PointerMove,
    KeyPress,
    Scroll,
    Touch,
    Click,
}

impl InteractionSignal {
    pub const ALL: [InteractionSignal; 5] = [
        Self::PointerMove,
        Self::KeyPress,
        Self::Scroll,
        Self::Touch,
        Self::Click,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PointerMove => "pointer_move",
            Self::KeyPress => "key_press",
            Self::Scroll => "scroll",
            Self::Touch => "touch",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for InteractionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Background task that runs [`SessionManager::check_inactivity`] on the
/// configured interval.
///
/// The task is aborted when the monitor is stopped or dropped.
pub struct InactivityMonitor {
    handle: JoinHandle<()>,
}

impl InactivityMonitor {
    /// Must be called from within a tokio runtime.
    pub fn spawn<U, L, H>(manager: Arc<SessionManager<U, L, H>>) -> Self
    where
        U: UserRepository + Clone + Send + Sync + 'static,
        L: LoginAuditRepository + Clone + Send + Sync + 'static,
        H: PasswordHasher + Clone + 'static,
    {
        let period = manager.config().activity_check_interval.max(MIN_CHECK_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if manager.check_inactivity().await {
                    log::debug!(target: LOG_TARGET, "msg=\"inactivity monitor ended session\"");
                }
            }
        });

        log::debug!(
            target: LOG_TARGET,
            "msg=\"inactivity monitor started\", period_secs={}",
            period.as_secs()
        );
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
