//! Store trait definitions

use chrono::{DateTime, Utc};
use playclock_util::UserId;
use serde::{Deserialize, Serialize};

use crate::{AuditEvent, StoreResult};

/// A user refused until `until`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    pub user_id: UserId,
    pub until: DateTime<Utc>,
    /// Reason shown to the user
    pub reason: String,
}

impl BanRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.until
    }
}

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Bans

    /// Get the ban record for a user, expired or not
    fn get_ban(&self, user_id: &UserId) -> StoreResult<Option<BanRecord>>;

    /// Create or replace a user's ban
    fn set_ban(&self, ban: &BanRecord) -> StoreResult<()>;

    /// Remove a user's ban. Returns whether there was one.
    fn clear_ban(&self, user_id: &UserId) -> StoreResult<bool>;

    /// Remove bans that ended at or before `now`. Returns how many.
    fn clear_expired_bans(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
