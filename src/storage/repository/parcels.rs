// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parcels and label assignment.

use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::super::database::{decode, encode, read_record, Database, RECORDS};
use super::super::{keys, StoreError, StoreResult};
use super::labels::StoredLabel;

/// Delivery status of a parcel.
///
/// Any status may be set at any time; no transition order is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    OnTheWay,
    Delivered,
    Received,
}

impl ParcelStatus {
    /// Parse the wire representation (`on_the_way`, `delivered`, `received`).
    pub fn parse(s: &str) -> Option<ParcelStatus> {
        match s {
            "on_the_way" => Some(ParcelStatus::OnTheWay),
            "delivered" => Some(ParcelStatus::Delivered),
            "received" => Some(ParcelStatus::Received),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelStatus::OnTheWay => "on_the_way",
            ParcelStatus::Delivered => "delivered",
            ParcelStatus::Received => "received",
        }
    }
}

impl std::fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parcel record stored under `parcel:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredParcel {
    #[serde(skip)]
    pub id: Uuid,
    pub label_id: Uuid,
    pub status: ParcelStatus,
}

/// Repository for parcels.
pub struct ParcelRepository<'a> {
    db: &'a Database,
}

impl<'a> ParcelRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a parcel for a label and assign it to that label.
    ///
    /// The label lookup, the "already assigned" check, the parcel insert and
    /// the write-back of `assignedParcel` share one write transaction. Of two
    /// concurrent calls for the same label exactly one succeeds; the other
    /// sees the assignment and fails with [`StoreError::Conflict`].
    pub fn create(&self, label_id: &Uuid, status: ParcelStatus) -> StoreResult<StoredParcel> {
        let parcel = StoredParcel {
            id: Uuid::new_v4(),
            label_id: *label_id,
            status,
        };
        let label_key = keys::label(label_id);

        let write_txn = self.db.raw().begin_write()?;
        {
            let mut records = write_txn.open_table(RECORDS)?;

            let label: StoredLabel = read_record(&records, &label_key)?
                .ok_or_else(|| StoreError::NotFound(format!("Label {label_id}")))?;
            if label.assigned_parcel.is_some() {
                return Err(StoreError::Conflict(format!(
                    "Label {label_id} is already assigned to a parcel"
                )));
            }

            let parcel_json = encode(&parcel)?;
            records.insert(keys::parcel(&parcel.id).as_str(), parcel_json.as_slice())?;

            let assigned = StoredLabel {
                assigned_parcel: Some(parcel.id),
                ..label
            };
            let label_json = encode(&assigned)?;
            records.insert(label_key.as_str(), label_json.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(parcel_id = %parcel.id, label_id = %label_id, status = %status, "Created parcel");
        Ok(parcel)
    }

    /// Get a parcel by id.
    pub fn get(&self, id: &Uuid) -> StoreResult<StoredParcel> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        let parcel: Option<StoredParcel> = read_record(&table, &keys::parcel(id))?;
        parcel
            .map(|parcel| StoredParcel { id: *id, ..parcel })
            .ok_or_else(|| StoreError::NotFound(format!("Parcel {id}")))
    }

    /// Every parcel in the store.
    pub fn list_all(&self) -> StoreResult<Vec<StoredParcel>> {
        let read_txn = self.db.raw().begin_read()?;
        let records = read_txn.open_table(RECORDS)?;

        let (start, end) = keys::prefix_range(keys::PARCEL_PREFIX);
        let mut parcels = Vec::new();
        for entry in records.range(start.as_str()..end.as_str())? {
            let (key, value) = entry?;
            let Some(id) = keys::id_after(keys::PARCEL_PREFIX, key.value()) else {
                continue;
            };
            let parcel: StoredParcel = decode(key.value(), value.value())?;
            parcels.push(StoredParcel { id, ..parcel });
        }

        Ok(parcels)
    }

    /// Overwrite the status of an existing parcel.
    pub fn update_status(&self, id: &Uuid, status: ParcelStatus) -> StoreResult<StoredParcel> {
        let key = keys::parcel(id);

        let write_txn = self.db.raw().begin_write()?;
        let updated = {
            let mut records = write_txn.open_table(RECORDS)?;

            let existing: StoredParcel = read_record(&records, &key)?
                .ok_or_else(|| StoreError::NotFound(format!("Parcel {id}")))?;
            let updated = StoredParcel {
                id: *id,
                status,
                ..existing
            };
            let json = encode(&updated)?;
            records.insert(key.as_str(), json.as_slice())?;
            updated
        };
        write_txn.commit()?;

        tracing::info!(parcel_id = %id, status = %status, "Updated parcel status");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::storage::repository::labels::{LabelRepository, NewLabel};
    use crate::storage::test_support::temp_db;

    fn create_label(db: &Database) -> StoredLabel {
        LabelRepository::new(db)
            .create(NewLabel {
                sender: "alice".to_string(),
                recipient: "Bob".to_string(),
                locker: "WAW01ABCD".to_string(),
                size: 10,
            })
            .unwrap()
    }

    #[test]
    fn status_wire_names() {
        for status in [
            ParcelStatus::OnTheWay,
            ParcelStatus::Delivered,
            ParcelStatus::Received,
        ] {
            assert_eq!(ParcelStatus::parse(status.as_str()), Some(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        assert_eq!(ParcelStatus::parse("lost"), None);
    }

    #[test]
    fn create_assigns_label() {
        let (db, _dir) = temp_db();
        let label = create_label(&db);
        let repo = ParcelRepository::new(&db);

        let parcel = repo.create(&label.id, ParcelStatus::OnTheWay).unwrap();
        assert_eq!(parcel.label_id, label.id);

        let stored_label = LabelRepository::new(&db).get(&label.id).unwrap();
        assert_eq!(stored_label.assigned_parcel, Some(parcel.id));
        assert_eq!(repo.get(&parcel.id).unwrap(), parcel);
    }

    #[test]
    fn second_assignment_conflicts() {
        let (db, _dir) = temp_db();
        let label = create_label(&db);
        let repo = ParcelRepository::new(&db);

        let first = repo.create(&label.id, ParcelStatus::OnTheWay).unwrap();
        let err = repo.create(&label.id, ParcelStatus::Delivered).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let parcels = repo.list_all().unwrap();
        assert_eq!(parcels, vec![first]);
    }

    #[test]
    fn unknown_label_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = ParcelRepository::new(&db);
        let err = repo.create(&Uuid::new_v4(), ParcelStatus::OnTheWay).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(repo.list_all().unwrap().is_empty());
    }

    #[test]
    fn concurrent_assignment_has_single_winner() {
        let (db, _dir) = temp_db();
        let db = Arc::new(db);
        let label = create_label(&db);

        for _ in 0..4 {
            // Fresh label per round so every round races on an unassigned one.
            let label = create_label(&db);
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let db = Arc::clone(&db);
                    let barrier = Arc::clone(&barrier);
                    let label_id = label.id;
                    thread::spawn(move || {
                        barrier.wait();
                        ParcelRepository::new(&db).create(&label_id, ParcelStatus::OnTheWay)
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let successes = results.iter().filter(|r| r.is_ok()).count();
            let conflicts = results
                .iter()
                .filter(|r| matches!(r, Err(StoreError::Conflict(_))))
                .count();
            assert_eq!((successes, conflicts), (1, 1));

            let winner = results.into_iter().find_map(Result::ok).unwrap();
            let stored = LabelRepository::new(&db).get(&label.id).unwrap();
            assert_eq!(stored.assigned_parcel, Some(winner.id));
        }

        // The label created before the loop is still free.
        assert_eq!(
            LabelRepository::new(&db).get(&label.id).unwrap().assigned_parcel,
            None
        );
    }

    #[test]
    fn update_status_overwrites_freely() {
        let (db, _dir) = temp_db();
        let label = create_label(&db);
        let repo = ParcelRepository::new(&db);
        let parcel = repo.create(&label.id, ParcelStatus::OnTheWay).unwrap();

        let received = repo.update_status(&parcel.id, ParcelStatus::Received).unwrap();
        assert_eq!(received.status, ParcelStatus::Received);

        // Going back is allowed.
        repo.update_status(&parcel.id, ParcelStatus::OnTheWay).unwrap();
        assert_eq!(repo.get(&parcel.id).unwrap().status, ParcelStatus::OnTheWay);
        assert_eq!(repo.get(&parcel.id).unwrap().label_id, label.id);
    }

    #[test]
    fn update_unknown_parcel_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = ParcelRepository::new(&db);
        let err = repo
            .update_status(&Uuid::new_v4(), ParcelStatus::Delivered)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
