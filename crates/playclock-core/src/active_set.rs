//! Indexed priority set of active trackers

use chrono::{DateTime, Utc};
use playclock_util::UserId;
use std::collections::{BTreeMap, HashMap};

type Key = (DateTime<Utc>, u64);

/// A user in the active set
///
/// Two entries for the same user differ in `seq` if the user left and came
/// back in between, so comparing entries tells a rearm apart from a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEntry {
    pub user_id: UserId,
    /// See `TimeTracker::effective_start`
    pub effective_start: DateTime<Utc>,
    /// Insertion sequence, breaks ties between equal effective starts
    pub seq: u64,
}

/// Active users ordered by nearest deadline
///
/// The head is the user with the most tracked time. Insert, remove by user
/// and peek are all O(log n).
#[derive(Debug, Default)]
pub struct ActiveSet {
    entries: BTreeMap<Key, UserId>,
    index: HashMap<UserId, Key>,
    next_seq: u64,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, replacing any existing entry for them
    ///
    /// An existing entry with the same effective start is kept as is.
    pub fn insert(&mut self, user_id: UserId, effective_start: DateTime<Utc>) -> ActiveEntry {
        if let Some(&(existing_start, seq)) = self.index.get(&user_id) {
            if existing_start == effective_start {
                return ActiveEntry {
                    user_id,
                    effective_start,
                    seq,
                };
            }
            self.remove(&user_id);
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let key = (effective_start, seq);
        self.entries.insert(key, user_id.clone());
        self.index.insert(user_id.clone(), key);

        ActiveEntry {
            user_id,
            effective_start,
            seq,
        }
    }

    pub fn remove(&mut self, user_id: &UserId) -> Option<ActiveEntry> {
        let key = self.index.remove(user_id)?;
        let user_id = self.entries.remove(&key)?;
        Some(ActiveEntry {
            user_id,
            effective_start: key.0,
            seq: key.1,
        })
    }

    /// The entry with the nearest deadline
    pub fn peek(&self) -> Option<ActiveEntry> {
        self.entries
            .first_key_value()
            .map(|(&(effective_start, seq), user_id)| ActiveEntry {
                user_id: user_id.clone(),
                effective_start,
                seq,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
