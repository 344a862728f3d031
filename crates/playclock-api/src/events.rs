//! Event types for playclockd -> client streaming

use chrono::{DateTime, Local};
use playclock_util::UserId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::API_VERSION;

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: playclock_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A user's session is now being tracked
    TrackingStarted {
        user_id: UserId,
        remaining: Duration,
    },

    /// A user's session was closed
    TrackingStopped {
        user_id: UserId,
        tracked: Duration,
    },

    /// A user used up their allowance; the punishment has been applied.
    /// Hosts should disconnect the user.
    LimitReached {
        user_id: UserId,
        limit: Duration,
        until: DateTime<Local>,
    },

    /// An admin lifted a ban
    BanCleared { user_id: UserId },

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::LimitReached {
            user_id: UserId::new("steve"),
            limit: Duration::from_secs(3600),
            until: playclock_util::now(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"limit_reached\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(parsed.payload, EventPayload::LimitReached { .. }));
    }

    #[test]
    fn unit_event_serialization() {
        let json = serde_json::to_string(&Event::new(EventPayload::Shutdown)).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed.payload, EventPayload::Shutdown));
    }
}
