// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated caller.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! The gates in `middleware.rs` normally resolve the caller first; the
//! extractors then only read the request extensions. Without a gate, `Auth`
//! falls back to verifying the bearer token itself.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::middleware::bearer_token;
use super::session::CurrentSession;
use super::{AuthError, AuthenticatedUser, Capability};
use crate::state::AppState;

/// Extractor for authenticated callers.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if a gate already set the user
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let Some(authority) = state.tokens.as_deref() else {
            return Err(AuthError::NotLoggedIn);
        };
        let user = authority.verify(bearer_token(&parts.headers)?)?;
        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// Extractor that requires a caller who manages their own labels.
pub struct SenderOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for SenderOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.can(Capability::ManageOwnLabels) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(SenderOnly(user))
    }
}

/// Extractor that requires courier capabilities.
pub struct CourierOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for CourierOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.can(Capability::CreateParcels) {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(CourierOnly(user))
    }
}

/// The live session resolved by a session gate.
pub struct Session(pub CurrentSession);

impl FromRequestParts<AppState> for Session {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .map(Session)
            .ok_or(AuthError::NotLoggedIn)
    }
}

/// The session, if a gate resolved one.
pub struct OptionalSession(pub Option<CurrentSession>);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(parts.extensions.get::<CurrentSession>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::state::test_support::{session_config, test_state, token_config};
    use axum::http::Request;

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            login: "alice".to_string(),
            role,
            expires_at: 0,
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _dir) = test_state(&token_config());
        let mut parts = parts_with(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_jwt() {
        let (state, _dir) = test_state(&token_config());
        let (token, _) = state.tokens.as_ref().unwrap().issue("alice", Role::Sender).unwrap();
        let mut parts = parts_with(Some(format!("Bearer {token}")));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.login, "alice");
        assert_eq!(user.role, Role::Sender);
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _dir) = test_state(&session_config());
        let mut parts = parts_with(None);
        parts.extensions.insert(user(Role::Sender));

        let Auth(found) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(found.login, "alice");
    }

    #[tokio::test]
    async fn session_mode_without_gate_is_not_logged_in() {
        let (state, _dir) = test_state(&session_config());
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn courier_only_rejects_sender() {
        let (state, _dir) = test_state(&token_config());
        let mut parts = parts_with(None);
        parts.extensions.insert(user(Role::Sender));

        let result = CourierOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn sender_only_rejects_courier() {
        let (state, _dir) = test_state(&token_config());
        let mut parts = parts_with(None);
        parts.extensions.insert(user(Role::Courier));

        let result = SenderOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn optional_auth_returns_none_without_user() {
        let (state, _dir) = test_state(&token_config());
        let mut parts = parts_with(Some("Bearer garbage".to_string()));

        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(user.is_none());
    }
}
