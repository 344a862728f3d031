//! Core events emitted by the scheduler

use chrono::{DateTime, Utc};
use playclock_util::UserId;
use std::time::Duration;

/// Events emitted by the deadline scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// A user's session started being tracked
    TrackingStarted {
        user_id: UserId,
        tracked: Duration,
        remaining: Duration,
    },

    /// A user's session was closed
    TrackingStopped {
        user_id: UserId,
        tracked: Duration,
    },

    /// A user reached the limit. Their tracker has been reset and the
    /// punitive action invoked.
    LimitReached {
        user_id: UserId,
        limit: Duration,
        window_end: DateTime<Utc>,
    },

    /// The punitive action returned an error. Not retried.
    ActionFailed {
        user_id: UserId,
        error: String,
    },
}

impl CoreEvent {
    pub fn user_id(&self) -> &UserId {
        match self {
            CoreEvent::TrackingStarted { user_id, .. }
            | CoreEvent::TrackingStopped { user_id, .. }
            | CoreEvent::LimitReached { user_id, .. }
            | CoreEvent::ActionFailed { user_id, .. } => user_id,
        }
    }
}
