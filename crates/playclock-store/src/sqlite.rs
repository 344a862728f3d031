//! SQLite-based store implementation

use chrono::{DateTime, Local, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use playclock_util::UserId;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, BanRecord, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Bans, one per user
            CREATE TABLE IF NOT EXISTS bans (
                user_id TEXT PRIMARY KEY,
                until_ts INTEGER NOT NULL,
                reason TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_bans_until ON bans(until_ts);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| playclock_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn get_ban(&self, user_id: &UserId) -> StoreResult<Option<BanRecord>> {
        let conn = self.conn()?;

        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT until_ts, reason FROM bans WHERE user_id = ?",
                [user_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((until_ts, reason)) = row else {
            return Ok(None);
        };

        let until = DateTime::<Utc>::from_timestamp(until_ts, 0).ok_or_else(|| {
            StoreError::Serialization(format!("ban timestamp out of range: {}", until_ts))
        })?;

        Ok(Some(BanRecord {
            user_id: user_id.clone(),
            until,
            reason,
        }))
    }

    fn set_ban(&self, ban: &BanRecord) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO bans (user_id, until_ts, reason)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id)
            DO UPDATE SET until_ts = excluded.until_ts, reason = excluded.reason
            "#,
            params![ban.user_id.as_str(), ban.until.timestamp(), ban.reason],
        )?;

        debug!(user_id = %ban.user_id, until = %ban.until, "Ban set");
        Ok(())
    }

    fn clear_ban(&self, user_id: &UserId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM bans WHERE user_id = ?", [user_id.as_str()])?;
        Ok(removed > 0)
    }

    fn clear_expired_bans(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM bans WHERE until_ts <= ?", [now.timestamp()])?;
        if removed > 0 {
            debug!(removed, "Expired bans cleared");
        }
        Ok(removed)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use std::time::Duration;

    fn ban(user: &str, until: DateTime<Utc>) -> BanRecord {
        BanRecord {
            user_id: UserId::new(user),
            until,
            reason: "Out of time".into(),
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::LimitReached {
                user_id: UserId::new("steve"),
                limit: Duration::from_secs(3600),
                window_end: Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        // Newest first
        assert!(matches!(
            &events[0].event,
            AuditEventType::LimitReached { user_id, .. } if user_id.as_str() == "steve"
        ));
        assert!(matches!(events[1].event, AuditEventType::ServiceStarted));
        assert!(events[0].id > events[1].id);

        assert_eq!(store.get_recent_audits(1).unwrap().len(), 1);
    }

    #[test]
    fn test_bans() {
        let store = SqliteStore::in_memory().unwrap();
        let user = UserId::new("steve");
        let until = Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap();

        assert!(store.get_ban(&user).unwrap().is_none());

        store.set_ban(&ban("steve", until)).unwrap();
        let stored = store.get_ban(&user).unwrap().unwrap();
        assert_eq!(stored, ban("steve", until));
        assert!(stored.is_active(until - TimeDelta::seconds(1)));
        assert!(!stored.is_active(until));

        // Replacing moves the end
        let later = until + TimeDelta::days(1);
        store.set_ban(&ban("steve", later)).unwrap();
        assert_eq!(store.get_ban(&user).unwrap().unwrap().until, later);

        assert!(store.clear_ban(&user).unwrap());
        assert!(!store.clear_ban(&user).unwrap());
        assert!(store.get_ban(&user).unwrap().is_none());
    }

    #[test]
    fn test_clear_expired_bans() {
        let store = SqliteStore::in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap();

        store.set_ban(&ban("past", now - TimeDelta::hours(1))).unwrap();
        store.set_ban(&ban("boundary", now)).unwrap();
        store.set_ban(&ban("future", now + TimeDelta::hours(1))).unwrap();

        assert_eq!(store.clear_expired_bans(now).unwrap(), 2);
        assert!(store.get_ban(&UserId::new("past")).unwrap().is_none());
        assert!(store.get_ban(&UserId::new("future")).unwrap().is_some());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playclock.db");
        let until = Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_ban(&ban("steve", until)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get_ban(&UserId::new("steve")).unwrap().map(|b| b.until),
            Some(until)
        );
    }
}
