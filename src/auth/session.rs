// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cookie sessions backed by the entity store.
//!
//! The cookie carries only a random session id. Everything else lives in the
//! `sessions` table:
//!
//! ```text
//! Anonymous --login--> Authenticated(login, loginTime) --logout/expiry--> Anonymous
//! ```
//!
//! Expired records count as anonymous and are deleted on first sight; the
//! sweeper started by the server purges the rest.

use std::time::Duration;

use axum::http::{header::COOKIE, HeaderMap};
use chrono::Utc;
use cookie::{Cookie, SameSite};
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::claims::AuthenticatedUser;
use super::roles::Role;
use crate::config::AppConfig;
use crate::state::AppState;
use crate::storage::{SessionRecord, SessionRepository, StoreResult};

/// Random bytes in a session id.
const SESSION_ID_BYTES: usize = 32;

/// Cookie attributes and lifetime of sessions.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub secure: bool,
    pub max_age: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cookie_name: config.session_name.clone(),
            secure: config.secure_cookie,
            max_age: config.session_max_age,
        }
    }

    /// Cookie carrying a fresh session id.
    pub fn cookie(&self, id: &str) -> Cookie<'static> {
        self.build(id.to_owned(), self.max_age)
    }

    /// Cookie telling the browser to drop the session immediately.
    pub fn expired_cookie(&self) -> Cookie<'static> {
        self.build(String::new(), Duration::ZERO)
    }

    fn build(&self, value: String, max_age: Duration) -> Cookie<'static> {
        let seconds = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(seconds))
            .build()
    }

    /// Session id sent by the client, if any.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name && !cookie.value().is_empty())
            .map(|cookie| cookie.value().to_owned())
    }
}

/// A live session attached to the request by the session gate.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: String,
    pub record: SessionRecord,
}

impl CurrentSession {
    /// Session callers are always senders.
    pub fn user(&self) -> AuthenticatedUser {
        AuthenticatedUser {
            login: self.record.login.clone(),
            role: Role::Sender,
            expires_at: self.record.expires_at.timestamp(),
        }
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Resolve the session named by the request cookie.
///
/// Missing, unknown and expired sessions all resolve to `None`.
pub async fn load(state: &AppState, headers: &HeaderMap) -> StoreResult<Option<CurrentSession>> {
    let Some(id) = state.sessions.session_id(headers) else {
        return Ok(None);
    };

    state
        .with_store(move |db| {
            let repo = SessionRepository::new(db);
            match repo.get(&id)? {
                Some(record) if !record.is_expired(Utc::now()) => {
                    Ok(Some(CurrentSession { id, record }))
                }
                Some(_) => {
                    repo.remove(&id)?;
                    tracing::debug!("Dropped expired session");
                    Ok(None)
                }
                None => Ok(None),
            }
        })
        .await
}

/// Start a session for `login` and return the cookie to set.
pub async fn login(state: &AppState, login: &str) -> StoreResult<Cookie<'static>> {
    let id = new_session_id();
    let now = Utc::now();
    let max_age = chrono::Duration::from_std(state.sessions.max_age)
        .unwrap_or_else(|_| chrono::Duration::days(1));
    let record = SessionRecord {
        login: login.to_owned(),
        login_time: now,
        expires_at: now + max_age,
    };

    let cookie = state.sessions.cookie(&id);
    state
        .with_store(move |db| SessionRepository::new(db).put(&id, &record))
        .await?;

    tracing::info!(login, "Sender logged in");
    Ok(cookie)
}

/// End a session and return the expiring cookie to set.
pub async fn logout(state: &AppState, session: Option<CurrentSession>) -> StoreResult<Cookie<'static>> {
    if let Some(session) = session {
        let login = session.record.login.clone();
        state
            .with_store(move |db| SessionRepository::new(db).remove(&session.id))
            .await?;
        tracing::info!(login = %login, "Sender logged out");
    }
    Ok(state.sessions.expired_cookie())
}

/// Purge expired sessions every `interval` until `cancel` fires.
pub async fn run_sweeper(state: AppState, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopped");
                return;
            }
            _ = ticker.tick() => {
                let result = state
                    .with_store(|db| SessionRepository::new(db).purge_expired(Utc::now()))
                    .await;
                match result {
                    Ok(0) => {}
                    Ok(purged) => tracing::info!(purged, "Purged expired sessions"),
                    Err(e) => tracing::error!(error = %e, "Session sweep failed"),
                }
            }
        }
    }
}
