// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Entity Store
//!
//! Persistence for users, labels, parcels and sessions on top of an embedded
//! redb database.
//!
//! ## Storage Layout
//!
//! ```text
//! user:<login>              { passwordHash, email, firstname, lastname, address }
//! label:<id>                { sender, recipient, locker, size, assignedParcel }
//! parcel:<id>               { labelId, status }
//! user:<login>:labels       set of label ids owned by the sender
//! session:<id>              { login, loginTime, expiresAt }
//! ```
//!
//! ## Atomicity
//!
//! Operations that touch more than one key (label + sender index, parcel +
//! label assignment) run inside a single write transaction. They either
//! fully commit or leave the store untouched, and concurrent assignment of
//! the same label resolves to exactly one winner.

pub mod database;
pub mod keys;
pub mod repository;

use std::time::Duration;

pub use database::Database;
pub use repository::{
    LabelRepository, NewLabel, ParcelRepository, ParcelStatus, RemoveOutcome, SessionRecord,
    SessionRepository, StoredLabel, StoredParcel, StoredUser, UserRepository,
};

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store worker failed: {0}")]
    Worker(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
