//! Audit event types

use chrono::{DateTime, Local, Utc};
use playclock_util::UserId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// A user used up their allowance
    LimitReached {
        user_id: UserId,
        limit: Duration,
        window_end: DateTime<Utc>,
    },

    /// A user was banned until the end of the window
    BanIssued {
        user_id: UserId,
        until: DateTime<Utc>,
    },

    /// An admin lifted a ban
    BanCleared { user_id: UserId },

    /// Activity from a banned user was refused
    ActivityRejected {
        user_id: UserId,
        until: DateTime<Utc>,
    },

    /// The punitive action failed
    ActionFailed { user_id: UserId, error: String },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: playclock_util::now(),
            event,
        }
    }
}
