//! Collaborator traits

use chrono::{DateTime, Utc};
use playclock_util::UserId;
use std::time::Duration;
use thiserror::Error;

use crate::TimerHandle;

/// Errors from punitive actions
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Action failed: {0}")]
    Failed(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type ActionResult<T> = Result<T, ActionError>;

/// One-shot timer facility
///
/// The scheduler arms at most one timer at a time. When a timer fires, the
/// implementation delivers its handle back onto the scheduler's control
/// thread (typically over a channel), where it is passed to
/// `DeadlineScheduler::on_timer_fired`.
pub trait TimerService: Send {
    /// Arm a timer that fires once after `after`
    fn arm(&mut self, after: Duration) -> TimerHandle;

    /// Cancel an armed timer
    ///
    /// Must be a no-op for a handle that has already fired or was already
    /// cancelled.
    fn cancel(&mut self, handle: TimerHandle);
}

/// The punishment applied when a user reaches the limit
///
/// Invoked exactly once per expiry. The engine has already reset the user's
/// tracker by the time this runs and never retries a failure, so
/// implementations own their retry and alerting.
pub trait PunitiveAction: Send {
    fn apply(&self, user_id: &UserId, limit: Duration, window_end: DateTime<Utc>) -> ActionResult<()>;

    /// Short name for logs
    fn name(&self) -> &'static str {
        "action"
    }
}

/// Notifications from the host platform about a user's presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    /// The user joined or logged in
    Started(UserId),
    /// The user left or logged out
    Stopped(UserId),
}

impl ActivityEvent {
    pub fn user_id(&self) -> &UserId {
        match self {
            ActivityEvent::Started(id) | ActivityEvent::Stopped(id) => id,
        }
    }
}
