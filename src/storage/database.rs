// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded key-value database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `records`: entity key → JSON record (`user:*`, `label:*`, `parcel:*`)
//! - `indexes`: set membership key → marker byte
//! - `sessions`: `session:<id>` → JSON session record
//!
//! redb runs one write transaction at a time. Any read-check-write sequence
//! performed inside a single write transaction is therefore atomic with
//! respect to every other writer.

use std::path::Path;

use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

use super::{StoreError, StoreResult};

// =============================================================================
// Table Definitions
// =============================================================================

/// Entity records keyed by namespaced identifier.
pub(crate) const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Set memberships (`<set>|<member>` → 1).
pub(crate) const INDEXES: TableDefinition<&str, u8> = TableDefinition::new("indexes");

/// Server-side session records.
pub(crate) const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Value stored for every set member.
pub(crate) const MEMBER: u8 = 1;

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "parcel-locker.redb";

// =============================================================================
// Database
// =============================================================================

/// Handle to the embedded database.
///
/// Cheap to share behind an `Arc`; redb handles its own locking.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS)?;
            let _ = write_txn.open_table(INDEXES)?;
            let _ = write_txn.open_table(SESSIONS)?;
        }
        write_txn.commit()?;

        tracing::info!(path = %path.display(), "Opened entity store");
        Ok(Self { db })
    }

    /// Open the database file inside `data_dir`.
    pub fn open_in(data_dir: &Path) -> StoreResult<Self> {
        Self::open(&data_dir.join(DATABASE_FILE))
    }

    pub(crate) fn raw(&self) -> &redb::Database {
        &self.db
    }

    /// Verify that a read transaction can be opened on every table.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        read_txn.open_table(RECORDS)?;
        read_txn.open_table(INDEXES)?;
        read_txn.open_table(SESSIONS)?;
        Ok(())
    }
}

// =============================================================================
// Record Helpers
// =============================================================================

/// Deserialize a record, tagging decode failures with the key.
pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
        key: key.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn encode<T: Serialize>(record: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

/// Read and decode a record from any readable table.
pub(crate) fn read_record<T, Tbl>(table: &Tbl, key: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => decode(key, value.value()).map(Some),
        None => Ok(None),
    }
}
