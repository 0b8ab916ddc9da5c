// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the entity store.
//!
//! Each repository borrows the [`Database`](super::Database) and provides the
//! operations for one entity type.

pub mod labels;
pub mod parcels;
pub mod sessions;
pub mod users;

pub use labels::{LabelRepository, NewLabel, RemoveOutcome, StoredLabel};
pub use parcels::{ParcelRepository, ParcelStatus, StoredParcel};
pub use sessions::{SessionRecord, SessionRepository};
pub use users::{StoredUser, UserRepository};
