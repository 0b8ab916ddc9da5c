// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shipping labels and the per-sender label index.

use redb::ReadableDatabase;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::database::{decode, encode, read_record, Database, INDEXES, MEMBER, RECORDS};
use super::super::{keys, StoreError, StoreResult};

/// Label record stored under `label:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredLabel {
    /// Assigned by the store; carried by the key, not the record.
    #[serde(skip)]
    pub id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub locker: String,
    pub size: u32,
    /// Parcel created from this label, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_parcel: Option<Uuid>,
}

/// Validated label data awaiting an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabel {
    pub sender: String,
    pub recipient: String,
    pub locker: String,
    pub size: u32,
}

/// Result of a removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The label and its index entry were deleted.
    Removed,
    /// Nothing owned by the sender had this id; the store is unchanged.
    Absent,
}

/// Repository for labels.
pub struct LabelRepository<'a> {
    db: &'a Database,
}

impl<'a> LabelRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a new label under a fresh id and add it to the sender's set.
    ///
    /// Record and index entry are written in one transaction.
    pub fn create(&self, draft: NewLabel) -> StoreResult<StoredLabel> {
        let label = StoredLabel {
            id: Uuid::new_v4(),
            sender: draft.sender,
            recipient: draft.recipient,
            locker: draft.locker,
            size: draft.size,
            assigned_parcel: None,
        };
        let json = encode(&label)?;
        let member = keys::set_member(&keys::sender_labels(&label.sender), &label.id);

        let write_txn = self.db.raw().begin_write()?;
        {
            let mut records = write_txn.open_table(RECORDS)?;
            records.insert(keys::label(&label.id).as_str(), json.as_slice())?;

            let mut indexes = write_txn.open_table(INDEXES)?;
            indexes.insert(member.as_str(), MEMBER)?;
        }
        write_txn.commit()?;

        tracing::info!(label_id = %label.id, sender = %label.sender, "Created label");
        Ok(label)
    }

    /// Get a label by id.
    pub fn get(&self, id: &Uuid) -> StoreResult<StoredLabel> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        let label: Option<StoredLabel> = read_record(&table, &keys::label(id))?;
        label
            .map(|label| StoredLabel { id: *id, ..label })
            .ok_or_else(|| StoreError::NotFound(format!("Label {id}")))
    }

    /// All labels in the sender's set. Order is unspecified.
    pub fn list_by_sender(&self, sender: &str) -> StoreResult<Vec<StoredLabel>> {
        let read_txn = self.db.raw().begin_read()?;
        let indexes = read_txn.open_table(INDEXES)?;
        let records = read_txn.open_table(RECORDS)?;

        let (start, end) = keys::set_range(&keys::sender_labels(sender));
        let mut labels = Vec::new();
        for entry in indexes.range(start.as_str()..end.as_str())? {
            let (member, _) = entry?;
            let Some(id) = keys::member_id(member.value()) else {
                tracing::warn!(key = member.value(), "Skipping malformed index entry");
                continue;
            };
            match read_record::<StoredLabel, _>(&records, &keys::label(&id))? {
                Some(label) => labels.push(StoredLabel { id, ..label }),
                None => tracing::warn!(label_id = %id, sender, "Index entry without label"),
            }
        }

        Ok(labels)
    }

    /// Every label in the store (courier view).
    ///
    /// Full scan of the `label:` key range.
    pub fn list_all(&self) -> StoreResult<Vec<StoredLabel>> {
        let read_txn = self.db.raw().begin_read()?;
        let records = read_txn.open_table(RECORDS)?;

        let (start, end) = keys::prefix_range(keys::LABEL_PREFIX);
        let mut labels = Vec::new();
        for entry in records.range(start.as_str()..end.as_str())? {
            let (key, value) = entry?;
            let Some(id) = keys::id_after(keys::LABEL_PREFIX, key.value()) else {
                continue;
            };
            let label: StoredLabel = decode(key.value(), value.value())?;
            labels.push(StoredLabel { id, ..label });
        }

        Ok(labels)
    }

    /// Remove a label owned by `sender`.
    ///
    /// Removing an id that is gone, or that belongs to someone else, is a
    /// no-op reported as [`RemoveOutcome::Absent`]. A label that already has
    /// a parcel cannot be removed.
    pub fn remove(&self, sender: &str, id: &Uuid) -> StoreResult<RemoveOutcome> {
        let key = keys::label(id);
        let member = keys::set_member(&keys::sender_labels(sender), id);

        let write_txn = self.db.raw().begin_write()?;
        let outcome = {
            let mut records = write_txn.open_table(RECORDS)?;
            let mut indexes = write_txn.open_table(INDEXES)?;

            let existing: Option<StoredLabel> = read_record(&records, &key)?;
            match existing {
                Some(label) if label.sender == sender => {
                    if label.assigned_parcel.is_some() {
                        return Err(StoreError::Conflict(format!(
                            "Label {id} is already assigned to a parcel"
                        )));
                    }
                    records.remove(key.as_str())?;
                    indexes.remove(member.as_str())?;
                    RemoveOutcome::Removed
                }
                Some(_) => RemoveOutcome::Absent,
                None => {
                    // Drop a dangling index entry left behind by older data.
                    indexes.remove(member.as_str())?;
                    RemoveOutcome::Absent
                }
            }
        };
        write_txn.commit()?;

        if outcome == RemoveOutcome::Removed {
            tracing::info!(label_id = %id, sender, "Removed label");
        }
        Ok(outcome)
    }
}
