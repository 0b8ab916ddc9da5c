// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argon2 password hashing.
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
//! cost parameters, so verification needs nothing but the stored string.

use std::sync::OnceLock;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Hashing failed. Never caused by a wrong password.
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

fn salt() -> Result<SaltString, PasswordError> {
    use rand::Rng;
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    SaltString::encode_b64(&bytes).map_err(|e| PasswordError(e.to_string()))
}

/// Hash a plaintext password with a fresh random salt and default cost.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    Argon2::default()
        .hash_password(password.as_bytes(), &salt()?)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// Check `password` against a stored hash.
///
/// A malformed hash verifies as `false`.
pub fn verify(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .ok()
        .as_ref()
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Hash checked when there is no stored one, so an unknown login costs as
/// much as a wrong password.
fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| match hash("parcel-locker-decoy") {
            Ok(hashed) => Some(hashed),
            Err(e) => {
                tracing::warn!(error = %e, "Decoy hash unavailable");
                None
            }
        })
        .as_deref()
}

/// Check `password` against an optional stored hash.
///
/// A missing hash still runs a full verification and yields `false`.
pub fn verify_stored(hash: Option<&str>, password: &str) -> bool {
    match hash {
        Some(hash) => verify(hash, password),
        None => {
            if let Some(decoy) = decoy_hash() {
                let _ = verify(decoy, password);
            }
            false
        }
    }
}
