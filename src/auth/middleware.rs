// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route-level auth gates.
//!
//! Each gate resolves the caller once and stores an [`AuthenticatedUser`]
//! (and, in session mode, the [`CurrentSession`]) in the request extensions
//! for the extractors in `extractor.rs`.
//!
//! | Gate | No valid credential |
//! |------|---------------------|
//! | [`require_token`] | rejected with the auth error |
//! | [`optional_token`] | continues anonymously |
//! | [`require_session_redirect`] | `303` to `/sender/login` |
//! | [`require_session_forbid`] | `403` |
//! | [`anonymous_only`] | continues; logged-in callers get `303` to `/` |
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/labels", get(list_labels))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
//! ```

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::session;
use super::AuthError;
use crate::{error::ApiError, state::AppState};

/// Where anonymous callers are sent by the redirecting gate.
pub const LOGIN_PATH: &str = "/sender/login";

/// Where logged-in callers are sent by [`anonymous_only`].
pub const HOME_PATH: &str = "/";

/// Behavior when a token-gated request carries no valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPolicy {
    Required,
    Optional,
}

/// Behavior when a session-gated request has no live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPolicy {
    /// Send the browser to the login page
    Redirect,
    /// Answer `403 Forbidden`
    Forbid,
}

// =============================================================================
// Bearer tokens
// =============================================================================

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

async fn gate_token(state: AppState, mut request: Request, next: Next, policy: TokenPolicy) -> Response {
    let Some(authority) = state.tokens.as_deref() else {
        tracing::error!("Token gate used without a token authority");
        return AuthError::InternalError("token authority not configured".into()).into_response();
    };

    let verified = bearer_token(request.headers()).and_then(|token| authority.verify(token));
    match (verified, policy) {
        (Ok(user), _) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        (Err(_), TokenPolicy::Optional) => next.run(request).await,
        (Err(e), TokenPolicy::Required) => {
            tracing::debug!(error_code = e.error_code(), "Rejected bearer token");
            e.into_response()
        }
    }
}

/// Reject requests without a valid bearer token.
pub async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    gate_token(state, request, next, TokenPolicy::Required).await
}

/// Attach the caller when a valid token is present, continue otherwise.
pub async fn optional_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    gate_token(state, request, next, TokenPolicy::Optional).await
}

// =============================================================================
// Sessions
// =============================================================================

async fn resolve_session(state: &AppState, request: &mut Request) -> Result<bool, Response> {
    match session::load(state, request.headers()).await {
        Ok(Some(current)) => {
            request.extensions_mut().insert(current.user());
            request.extensions_mut().insert(current);
            Ok(true)
        }
        Ok(None) => Ok(false),
        Err(e) => Err(ApiError::from(e).into_response()),
    }
}

async fn gate_session(state: AppState, mut request: Request, next: Next, policy: SessionPolicy) -> Response {
    match resolve_session(&state, &mut request).await {
        Ok(true) => next.run(request).await,
        Ok(false) => match policy {
            SessionPolicy::Redirect => Redirect::to(LOGIN_PATH).into_response(),
            SessionPolicy::Forbid => AuthError::InsufficientPermissions.into_response(),
        },
        Err(response) => response,
    }
}

/// Send anonymous callers to the login page.
pub async fn require_session_redirect(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    gate_session(state, request, next, SessionPolicy::Redirect).await
}

/// Answer `403` to anonymous callers.
pub async fn require_session_forbid(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    gate_session(state, request, next, SessionPolicy::Forbid).await
}

/// Registration and login pages: logged-in callers go home.
pub async fn anonymous_only(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_session(&state, &mut request).await {
        Ok(true) => Redirect::to(HOME_PATH).into_response(),
        Ok(false) => next.run(request).await,
        Err(response) => response,
    }
}

/// Attach the session when there is one, never reject.
pub async fn optional_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_session(&state, &mut request).await {
        Ok(_) => next.run(request).await,
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::LOCATION, HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{AuthenticatedUser, Role};
    use crate::state::test_support::{session_config, test_state, token_config};

    async fn whoami(user: Option<Extension<AuthenticatedUser>>) -> String {
        user.map(|Extension(u)| u.login).unwrap_or_else(|| "anonymous".into())
    }

    fn app(state: AppState, gate: &str) -> Router {
        let route = Router::new().route("/", get(whoami));
        let route = match gate {
            "require_token" => route.route_layer(from_fn_with_state(state.clone(), require_token)),
            "optional_token" => route.route_layer(from_fn_with_state(state.clone(), optional_token)),
            "redirect" => route.route_layer(from_fn_with_state(state.clone(), require_session_redirect)),
            "forbid" => route.route_layer(from_fn_with_state(state.clone(), require_session_forbid)),
            "anonymous" => route.route_layer(from_fn_with_state(state.clone(), anonymous_only)),
            _ => unreachable!(),
        };
        route.with_state(state)
    }

    fn request(header: Option<(&'static str, String)>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingAuthHeader)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidAuthHeader)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidAuthHeader)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[tokio::test]
    async fn required_token_rejects_and_accepts() {
        let (state, _dir) = test_state(&token_config());
        let (token, _) = state.tokens.as_ref().unwrap().issue("alice", Role::Sender).unwrap();

        let response = app(state.clone(), "require_token").oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bad = Some(("authorization", "Bearer nope".to_string()));
        let response = app(state.clone(), "require_token").oneshot(request(bad)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let good = Some(("authorization", format!("Bearer {token}")));
        let response = app(state, "require_token").oneshot(request(good)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "alice");
    }

    #[tokio::test]
    async fn optional_token_passes_through() {
        let (state, _dir) = test_state(&token_config());
        let bad = Some(("authorization", "Bearer nope".to_string()));
        let response = app(state, "optional_token").oneshot(request(bad)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn session_gates_follow_policy() {
        let (state, _dir) = test_state(&session_config());

        let response = app(state.clone(), "redirect").oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], LOGIN_PATH);

        let response = app(state.clone(), "forbid").oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let cookie = session::login(&state, "alice").await.unwrap();
        let header = Some(("cookie", format!("session={}", cookie.value())));

        let response = app(state.clone(), "redirect").oneshot(request(header.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "alice");

        let response = app(state, "anonymous").oneshot(request(header)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], HOME_PATH);
    }

    #[tokio::test]
    async fn anonymous_only_lets_strangers_in() {
        let (state, _dir) = test_state(&session_config());
        let unknown = Some(("cookie", "session=deadbeef".to_string()));
        let response = app(state, "anonymous").oneshot(request(unknown)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
