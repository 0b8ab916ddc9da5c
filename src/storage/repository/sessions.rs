// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side session records for cookie authentication.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::super::database::{decode, encode, read_record, Database, SESSIONS};
use super::super::{keys, StoreResult};

/// Session data stored under `session:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub login: String,
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Repository for session records.
pub struct SessionRepository<'a> {
    db: &'a Database,
}

impl<'a> SessionRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load a session, expired or not.
    pub fn get(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        read_record(&table, &keys::session(id))
    }

    pub fn put(&self, id: &str, record: &SessionRecord) -> StoreResult<()> {
        let json = encode(record)?;
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut table = write_txn.open_table(SESSIONS)?;
            table.insert(keys::session(id).as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete a session. Returns whether one existed.
    pub fn remove(&self, id: &str) -> StoreResult<bool> {
        let write_txn = self.db.raw().begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(SESSIONS)?;
            let removed = table.remove(keys::session(id).as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Delete every session whose expiry is at or before `now`.
    ///
    /// Records that fail to decode are dropped as well.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let write_txn = self.db.raw().begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(SESSIONS)?;

            let mut stale = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                match decode::<SessionRecord>(key.value(), value.value()) {
                    Ok(record) if !record.is_expired(now) => {}
                    Ok(_) => stale.push(key.value().to_owned()),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping unreadable session record");
                        stale.push(key.value().to_owned());
                    }
                }
            }

            for key in &stale {
                table.remove(key.as_str())?;
            }
            stale.len()
        };
        write_txn.commit()?;

        if purged > 0 {
            tracing::debug!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::storage::test_support::temp_db;

    fn record(login: &str, ttl: Duration) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            login: login.to_string(),
            login_time: now,
            expires_at: now + ttl,
        }
    }

    #[test]
    fn put_get_remove() {
        let (db, _dir) = temp_db();
        let repo = SessionRepository::new(&db);
        let session = record("alice", Duration::hours(1));

        repo.put("abc", &session).unwrap();
        assert_eq!(repo.get("abc").unwrap(), Some(session));

        assert!(repo.remove("abc").unwrap());
        assert!(!repo.remove("abc").unwrap());
        assert_eq!(repo.get("abc").unwrap(), None);
    }

    #[test]
    fn purge_drops_only_expired_sessions() {
        let (db, _dir) = temp_db();
        let repo = SessionRepository::new(&db);

        repo.put("live", &record("alice", Duration::hours(1))).unwrap();
        repo.put("old", &record("bob", Duration::seconds(-5))).unwrap();
        repo.put("older", &record("carol", Duration::hours(-2))).unwrap();

        assert_eq!(repo.purge_expired(Utc::now()).unwrap(), 2);
        assert!(repo.get("live").unwrap().is_some());
        assert!(repo.get("old").unwrap().is_none());
        assert_eq!(repo.purge_expired(Utc::now()).unwrap(), 0);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let session = record("alice", Duration::minutes(5));
        assert!(!session.is_expired(session.login_time));
        assert!(session.is_expired(session.expires_at));
    }
}
