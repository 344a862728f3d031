//! Shared types for the playclockd API

use chrono::{DateTime, Local};
use playclock_util::{TimeOfDay, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Online-time accounting for a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub user_id: UserId,
    /// Whether a session is currently being tracked
    pub active: bool,
    /// Time accumulated in the current window
    pub tracked: Duration,
    /// Time left before the limit is reached
    pub remaining: Duration,
    /// When the limit will be reached if the session continues. None while idle.
    pub deadline: Option<DateTime<Local>>,
    /// Set while the user is serving a ban from an earlier expiry
    pub banned_until: Option<DateTime<Local>>,
}

/// The user the armed timer is waiting on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextDeadline {
    pub user_id: UserId,
    pub at: DateTime<Local>,
}

/// Full service state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStateSnapshot {
    pub api_version: u32,
    pub limit: Duration,
    pub reset_time: TimeOfDay,
    pub time_zone: String,
    pub window_start: DateTime<Local>,
    pub window_end: DateTime<Local>,
    /// Users with a tracker in this process
    pub tracked_users: usize,
    /// Users with a session in progress
    pub active_users: usize,
    pub next_deadline: Option<NextDeadline>,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Host platform integration - reports activity, queries status
    Host,
    /// Local admin - can also lift bans
    Admin,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_report_activity(&self) -> bool {
        matches!(self, ClientRole::Host | ClientRole::Admin)
    }

    pub fn can_clear_ban(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_permissions() {
        assert!(ClientRole::Host.can_report_activity());
        assert!(!ClientRole::Host.can_clear_ban());
        assert!(ClientRole::Admin.can_clear_ban());
        assert!(!ClientRole::Observer.can_report_activity());
    }

    #[test]
    fn user_status_serialization() {
        let status = UserStatus {
            user_id: UserId::new("steve"),
            active: false,
            tracked: Duration::from_secs(1200),
            remaining: Duration::from_secs(2400),
            deadline: None,
            banned_until: None,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"user_id\":\"steve\""));

        let parsed: UserStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
