// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sender accounts.

use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};

use super::super::database::{encode, read_record, Database, RECORDS};
use super::super::{keys, StoreError, StoreResult};
use crate::auth::password;

/// User record stored under `user:<login>`.
///
/// The login is the key and is not repeated inside the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(skip)]
    pub login: String,
    /// Argon2 PHC string, never the plaintext password.
    pub password_hash: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub address: String,
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Whether an account with this login exists.
    pub fn exists(&self, login: &str) -> StoreResult<bool> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        let found = table.get(keys::user(login).as_str())?.is_some();
        Ok(found)
    }

    /// Load an account.
    pub fn get(&self, login: &str) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.raw().begin_read()?;
        let table = read_txn.open_table(RECORDS)?;
        let user: Option<StoredUser> = read_record(&table, &keys::user(login))?;
        Ok(user.map(|user| StoredUser {
            login: login.to_owned(),
            ..user
        }))
    }

    /// Upsert an account, silently replacing any existing record.
    pub fn save(&self, user: &StoredUser) -> StoreResult<()> {
        let json = encode(user)?;
        let write_txn = self.db.raw().begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            table.insert(keys::user(&user.login).as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Insert an account only if the login is still free.
    ///
    /// The existence check and the insert share one write transaction, so two
    /// registrations racing for the same login cannot both succeed.
    pub fn create(&self, user: &StoredUser) -> StoreResult<()> {
        let key = keys::user(&user.login);
        let json = encode(user)?;

        let write_txn = self.db.raw().begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS)?;
            if table.get(key.as_str())?.is_some() {
                return Err(StoreError::Conflict(format!("login {} is taken", user.login)));
            }
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(login = %user.login, "Registered sender");
        Ok(())
    }

    /// Check a login attempt.
    ///
    /// Unknown logins and wrong passwords both yield `false`, after the same
    /// amount of hashing work.
    pub fn verify(&self, login: &str, password: &str) -> StoreResult<bool> {
        let user = self.get(login)?;
        Ok(password::verify_stored(
            user.as_ref().map(|u| u.password_hash.as_str()),
            password,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::temp_db;

    fn sample_user(login: &str) -> StoredUser {
        StoredUser {
            login: login.to_string(),
            password_hash: password::hash("secret12").unwrap(),
            email: "a@b.com".to_string(),
            firstname: "Alice".to_string(),
            lastname: "Doe".to_string(),
            address: "Main St".to_string(),
        }
    }

    #[test]
    fn save_and_get_user() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        assert!(!repo.exists("alice").unwrap());
        let user = sample_user("alice");
        repo.save(&user).unwrap();

        assert!(repo.exists("alice").unwrap());
        assert_eq!(repo.get("alice").unwrap(), Some(user));
        assert_eq!(repo.get("bob").unwrap(), None);
    }

    #[test]
    fn save_overwrites_existing_login() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        repo.save(&sample_user("alice")).unwrap();
        let mut changed = sample_user("alice");
        changed.address = "Second St".to_string();
        repo.save(&changed).unwrap();

        assert_eq!(repo.get("alice").unwrap().unwrap().address, "Second St");
    }

    #[test]
    fn create_rejects_taken_login() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);

        repo.create(&sample_user("alice")).unwrap();
        let mut second = sample_user("alice");
        second.email = "other@b.com".to_string();

        let err = repo.create(&second).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(repo.get("alice").unwrap().unwrap().email, "a@b.com");
    }

    #[test]
    fn stored_record_has_no_plaintext_password() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);
        repo.save(&sample_user("alice")).unwrap();

        let read_txn = db.raw().begin_read().unwrap();
        let table = read_txn.open_table(RECORDS).unwrap();
        let raw = table.get("user:alice").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(raw.value()).unwrap();

        assert!(json.get("passwordHash").is_some());
        assert!(json.get("login").is_none());
        assert!(!String::from_utf8_lossy(raw.value()).contains("secret12"));
    }

    #[test]
    fn verify_checks_password() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(&db);
        repo.save(&sample_user("alice")).unwrap();

        assert!(repo.verify("alice", "secret12").unwrap());
        assert!(!repo.verify("alice", "secret13").unwrap());
        assert!(!repo.verify("nobody", "secret12").unwrap());
        assert!(!repo.verify("nobody", "parcel-locker-decoy").unwrap());
        assert!(!repo.verify("", "").unwrap());
    }
}
