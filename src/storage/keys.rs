// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key layout of the flat key-value namespace.
//!
//! ```text
//! records:   user:<login>                  → user record
//!            label:<id>                    → label record
//!            parcel:<id>                   → parcel record
//! indexes:   user:<login>:labels|<id>      → member of the sender's label set
//! sessions:  session:<id>                  → session record
//! ```
//!
//! A set is the key range sharing its `<set>|` prefix, so membership tests
//! and listings are point lookups and range scans.

use uuid::Uuid;

/// Prefix shared by all label records.
pub const LABEL_PREFIX: &str = "label:";
/// Prefix shared by all parcel records.
pub const PARCEL_PREFIX: &str = "parcel:";
/// Prefix shared by all session records.
pub const SESSION_PREFIX: &str = "session:";

const SET_SEPARATOR: char = '|';

pub fn user(login: &str) -> String {
    format!("user:{login}")
}

pub fn label(id: &Uuid) -> String {
    format!("{LABEL_PREFIX}{id}")
}

pub fn parcel(id: &Uuid) -> String {
    format!("{PARCEL_PREFIX}{id}")
}

pub fn session(id: &str) -> String {
    format!("{SESSION_PREFIX}{id}")
}

/// Name of the set holding a sender's label ids.
pub fn sender_labels(login: &str) -> String {
    format!("user:{login}:labels")
}

/// Key recording that `id` is a member of `set`.
pub fn set_member(set: &str, id: &Uuid) -> String {
    format!("{set}{SET_SEPARATOR}{id}")
}

/// Half-open key range `[start, end)` covering every member of `set`.
pub fn set_range(set: &str) -> (String, String) {
    prefix_range(&format!("{set}{SET_SEPARATOR}"))
}

/// Half-open key range `[start, end)` covering every key starting with `prefix`.
///
/// Prefixes always end with an ASCII separator, so bumping the last byte
/// yields the first key past the range.
pub fn prefix_range(prefix: &str) -> (String, String) {
    let mut end = prefix.to_owned();
    match end.pop() {
        Some(last) if last.is_ascii() && last != '\u{7f}' => {
            end.push(char::from(last as u8 + 1));
        }
        Some(last) => {
            end.push(last);
            end.push(char::MAX);
        }
        None => end.push(char::MAX),
    }
    (prefix.to_owned(), end)
}

/// Strip `prefix` from a record key and parse the remaining id.
pub fn id_after(prefix: &str, key: &str) -> Option<Uuid> {
    key.strip_prefix(prefix)
        .and_then(|rest| Uuid::parse_str(rest).ok())
}

/// Extract the member id from a set membership key.
pub fn member_id(key: &str) -> Option<Uuid> {
    key.rsplit_once(SET_SEPARATOR)
        .and_then(|(_, id)| Uuid::parse_str(id).ok())
}
