// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Input Validation
//!
//! Pure checks applied to raw user input before any entity is built or
//! persisted. Every validator walks its rules in a fixed order and stops at
//! the first violation, so callers always get exactly one reason back.
//!
//! ## Rule Order
//!
//! | Entity | Order |
//! |--------|-------|
//! | User   | firstname, lastname, login, password (+ confirmation), email, address |
//! | Label  | sender, recipient, locker, size |
//! | Parcel | status, label id |
//!
//! The regular expressions are compiled once. [`init`] compiles them eagerly
//! so that a broken pattern stops the process at startup instead of failing
//! a request.

use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::storage::ParcelStatus;

/// Maximum length of a sender's postal address.
pub const ADDRESS_MAX_LEN: usize = 200;
/// Maximum length of a label recipient.
pub const RECIPIENT_MAX_LEN: usize = 100;
/// Minimum password length.
pub const PASSWORD_MIN_LEN: usize = 8;
/// Smallest accepted parcel size.
pub const SIZE_MIN: i64 = 1;
/// Largest accepted parcel size.
pub const SIZE_MAX: i64 = 8000;

const NAME_PATTERN: &str = "^[A-ZĄĆĘŁŃÓŚŹŻ][a-ząćęłńóśźż]+";
const LOGIN_PATTERN: &str = "^[a-z]{3,12}$";
const LOCKER_PATTERN: &str = "^[A-Z0-9]{9}$";
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

// =============================================================================
// Errors
// =============================================================================

/// A user-correctable validation failure.
///
/// Messages are the ones shown by the sender-facing forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Niepoprawne imię")]
    InvalidFirstname,
    #[error("Niepoprawne nazwisko")]
    InvalidLastname,
    #[error("Niepoprawny login")]
    InvalidLogin,
    #[error("Niepoprawne hasło")]
    InvalidPassword,
    #[error("Hasła powinny się pokrywać")]
    PasswordMismatch,
    #[error("Niepoprawny email")]
    InvalidEmail,
    #[error("Niepoprawny adres")]
    InvalidAddress,
    #[error("Niepoprawny nadawca")]
    InvalidSender,
    #[error("Niepoprawny adresat")]
    InvalidRecipient,
    #[error("Niepoprawny identyfikator skrytki")]
    InvalidLocker,
    #[error("Niepoprawny rozmiar paczki")]
    InvalidSize,
    #[error("Niepoprawny status paczki")]
    InvalidStatus,
    #[error("Niepoprawny identyfikator etykiety")]
    InvalidLabelId,
}

impl ValidationError {
    /// Name of the input field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidFirstname => "firstname",
            ValidationError::InvalidLastname => "lastname",
            ValidationError::InvalidLogin => "login",
            ValidationError::InvalidPassword => "password",
            ValidationError::PasswordMismatch => "passwordConfirmation",
            ValidationError::InvalidEmail => "email",
            ValidationError::InvalidAddress => "address",
            ValidationError::InvalidSender => "sender",
            ValidationError::InvalidRecipient => "recipient",
            ValidationError::InvalidLocker => "locker",
            ValidationError::InvalidSize => "size",
            ValidationError::InvalidStatus => "status",
            ValidationError::InvalidLabelId => "labelId",
        }
    }
}

/// A validation pattern failed to compile. Fatal at startup.
#[derive(Debug, thiserror::Error)]
#[error("validation pattern `{name}` failed to compile: {source}")]
pub struct PatternError {
    name: &'static str,
    #[source]
    source: regex::Error,
}

// =============================================================================
// Patterns
// =============================================================================

struct Patterns {
    name: Regex,
    login: Regex,
    locker: Regex,
    email: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

impl Patterns {
    fn compile() -> Result<Self, PatternError> {
        let build = |name: &'static str, pattern: &str| {
            Regex::new(pattern).map_err(|source| PatternError { name, source })
        };
        Ok(Self {
            name: build("name", NAME_PATTERN)?,
            login: build("login", LOGIN_PATTERN)?,
            locker: build("locker", LOCKER_PATTERN)?,
            email: build("email", EMAIL_PATTERN)?,
        })
    }
}

/// Compile all validation patterns.
///
/// Called once from `main` before the server starts accepting requests.
pub fn init() -> Result<(), PatternError> {
    if PATTERNS.get().is_none() {
        let compiled = Patterns::compile()?;
        // A concurrent initializer may have won; both values are identical.
        let _ = PATTERNS.set(compiled);
    }
    Ok(())
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        Patterns::compile().unwrap_or_else(|error| panic!("{error}"))
    })
}

/// Whether `login` is a syntactically valid login.
pub fn is_valid_login(login: &str) -> bool {
    patterns().login.is_match(login)
}

// =============================================================================
// Validators
// =============================================================================

/// Raw registration input.
#[derive(Debug, Clone, Copy)]
pub struct UserFields<'a> {
    pub login: &'a str,
    pub password: &'a str,
    /// Present when the form asks for the password twice.
    pub password_confirmation: Option<&'a str>,
    pub email: &'a str,
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub address: &'a str,
}

/// Validate a registration request.
pub fn validate_user(fields: &UserFields<'_>) -> Result<(), ValidationError> {
    let patterns = patterns();

    if !patterns.name.is_match(fields.firstname) {
        return Err(ValidationError::InvalidFirstname);
    }
    if !patterns.name.is_match(fields.lastname) {
        return Err(ValidationError::InvalidLastname);
    }
    if !patterns.login.is_match(fields.login) {
        return Err(ValidationError::InvalidLogin);
    }
    if fields.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ValidationError::InvalidPassword);
    }
    if let Some(confirmation) = fields.password_confirmation {
        if confirmation != fields.password {
            return Err(ValidationError::PasswordMismatch);
        }
    }
    if !patterns.email.is_match(fields.email) {
        return Err(ValidationError::InvalidEmail);
    }
    if !within_length(fields.address, ADDRESS_MAX_LEN) {
        return Err(ValidationError::InvalidAddress);
    }

    Ok(())
}

/// Validate a label before it is stored.
pub fn validate_label(
    sender: &str,
    recipient: &str,
    locker: &str,
    size: i64,
) -> Result<(), ValidationError> {
    let patterns = patterns();

    if !patterns.login.is_match(sender) {
        return Err(ValidationError::InvalidSender);
    }
    if !within_length(recipient, RECIPIENT_MAX_LEN) {
        return Err(ValidationError::InvalidRecipient);
    }
    if !patterns.locker.is_match(locker) {
        return Err(ValidationError::InvalidLocker);
    }
    if !(SIZE_MIN..=SIZE_MAX).contains(&size) {
        return Err(ValidationError::InvalidSize);
    }

    Ok(())
}

/// Parse the size field as typed into a form.
pub fn parse_size(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidSize)
}

/// Validate parcel input, returning the parsed label id and status.
///
/// Only the shape of the label id is checked here; whether the label exists
/// is decided by the store.
pub fn validate_parcel(
    label_id: &str,
    status: &str,
) -> Result<(Uuid, ParcelStatus), ValidationError> {
    let status = ParcelStatus::parse(status).ok_or(ValidationError::InvalidStatus)?;
    let label_id = Uuid::parse_str(label_id).map_err(|_| ValidationError::InvalidLabelId)?;
    Ok((label_id, status))
}

/// Non-empty and at most `max` characters.
fn within_length(value: &str, max: usize) -> bool {
    let len = value.chars().count();
    len > 0 && len <= max
}
