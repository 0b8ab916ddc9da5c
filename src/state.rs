// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::auth::jwt::TokenAuthority;
use crate::auth::session::SessionSettings;
use crate::config::{AppConfig, AuthMode};
use crate::storage::{Database, StoreError, StoreResult};

/// Shared handles passed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth_mode: AuthMode,
    /// Configured in token mode only.
    pub tokens: Option<Arc<TokenAuthority>>,
    pub sessions: Arc<SessionSettings>,
    pub store_timeout: Duration,
}

impl AppState {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let tokens = match (config.auth_mode, config.jwt_secret.as_deref()) {
            (AuthMode::Token, Some(secret)) => Some(Arc::new(TokenAuthority::new(
                secret.as_bytes(),
                config.jwt_ttl,
            ))),
            _ => None,
        };

        Self {
            db: Arc::new(db),
            auth_mode: config.auth_mode,
            tokens,
            sessions: Arc::new(SessionSettings::from_config(config)),
            store_timeout: config.store_timeout,
        }
    }

    /// Run a store operation on the blocking pool, bounded by the store
    /// timeout.
    ///
    /// On timeout the caller gets [`StoreError::Timeout`]; the operation
    /// itself still runs to completion in the background.
    pub async fn with_store<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let task = tokio::task::spawn_blocking(move || op(&db));

        match tokio::time::timeout(self.store_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(StoreError::Worker(join_error.to_string())),
            Err(_) => {
                tracing::warn!(timeout = ?self.store_timeout, "Store operation timed out");
                Err(StoreError::Timeout(self.store_timeout))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// State over a throwaway database.
    pub fn test_state(config: &AppConfig) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in(dir.path()).unwrap();
        (AppState::new(db, config), dir)
    }

    pub fn session_config() -> AppConfig {
        AppConfig::default()
    }

    pub fn token_config() -> AppConfig {
        AppConfig {
            auth_mode: AuthMode::Token,
            jwt_secret: Some("test-secret".to_string()),
            ..AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn with_store_returns_operation_result() {
        let (state, _dir) = test_state(&session_config());
        let exists = state
            .with_store(|db| crate::storage::UserRepository::new(db).exists("alice"))
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn with_store_times_out() {
        let config = AppConfig {
            store_timeout: Duration::from_millis(10),
            ..session_config()
        };
        let (state, _dir) = test_state(&config);

        let result = state
            .with_store(|_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[test]
    fn token_authority_only_in_token_mode() {
        let (session_state, _a) = test_state(&session_config());
        assert!(session_state.tokens.is_none());

        let (token_state, _b) = test_state(&token_config());
        assert!(token_state.tokens.is_some());
    }
}
