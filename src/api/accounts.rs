// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sender registration, login availability and token exchange.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};

use crate::{
    auth::{password, Auth, AuthError, AuthenticatedUser, Role},
    error::ApiError,
    models::{LoginRequest, RegisterRequest, RegisteredResponse, TokenResponse},
    state::AppState,
    storage::{StoredUser, UserRepository},
    validation::{self, UserFields, ValidationError},
};

/// Validate, hash and store a new sender.
async fn register(state: &AppState, request: RegisterRequest) -> Result<String, ApiError> {
    validation::validate_user(&UserFields {
        login: &request.login,
        password: &request.password,
        password_confirmation: request.password_confirmation.as_deref(),
        email: &request.email,
        firstname: &request.firstname,
        lastname: &request.lastname,
        address: &request.address,
    })?;

    let RegisterRequest {
        login,
        password: plaintext,
        email,
        firstname,
        lastname,
        address,
        ..
    } = request;

    let password_hash = tokio::task::spawn_blocking(move || password::hash(&plaintext))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing task failed");
            ApiError::internal()
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::internal()
        })?;

    let user = StoredUser {
        login: login.clone(),
        password_hash,
        email,
        firstname,
        lastname,
        address,
    };
    state
        .with_store(move |db| UserRepository::new(db).create(&user))
        .await?;

    Ok(login)
}

/// Check a login/password pair.
pub(crate) async fn credentials_valid(state: &AppState, request: LoginRequest) -> Result<bool, ApiError> {
    let valid = state
        .with_store(move |db| UserRepository::new(db).verify(&request.login, &request.password))
        .await?;
    Ok(valid)
}

/// Registration form; redirects to the login page.
#[utoipa::path(
    post,
    path = "/sender/register",
    request_body(content = RegisterRequest, content_type = "application/x-www-form-urlencoded"),
    tag = "Senders",
    responses(
        (status = 303, description = "Registered, continue at /sender/login"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Login taken")
    )
)]
pub async fn register_form(
    State(state): State<AppState>,
    Form(request): Form<RegisterRequest>,
) -> Result<Redirect, ApiError> {
    register(&state, request).await?;
    Ok(Redirect::to("/sender/login"))
}

/// JSON registration for API clients.
#[utoipa::path(
    post,
    path = "/sender/register",
    request_body = RegisterRequest,
    tag = "Senders",
    responses(
        (status = 201, body = RegisteredResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Login taken")
    )
)]
pub async fn register_json(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError> {
    let login = register(&state, request).await?;
    Ok((StatusCode::CREATED, Json(RegisteredResponse { login })))
}

/// Whether a login is still free: `{"<login>": "available" | "taken"}`.
/// A login that could never be registered is rejected outright.
#[utoipa::path(
    get,
    path = "/check/{login}",
    params(("login" = String, Path, description = "Login to look up")),
    tag = "Senders",
    responses(
        (status = 200, body = BTreeMap<String, String>),
        (status = 400, description = "Malformed login")
    )
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    if !validation::is_valid_login(&login) {
        return Err(ValidationError::InvalidLogin.into());
    }

    let key = login.clone();
    let taken = state
        .with_store(move |db| UserRepository::new(db).exists(&key))
        .await?;

    let availability = if taken { "taken" } else { "available" };
    Ok(Json(BTreeMap::from([(login, availability.to_string())])))
}

/// Exchange sender credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let Some(authority) = state.tokens.clone() else {
        tracing::error!("Token endpoint served without a token authority");
        return Err(ApiError::internal());
    };

    let login = request.login.clone();
    if !credentials_valid(&state, request).await? {
        tracing::info!(login = %login, "Rejected token request");
        return Ok(AuthError::InvalidCredentials.into_response());
    }

    let (token, _) = authority.issue(&login, Role::Sender)?;
    tracing::info!(login = %login, "Issued sender token");
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: authority.ttl().as_secs(),
        role: Role::Sender,
    })
    .into_response())
}

/// Identity carried by the presented token.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = AuthenticatedUser),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(Auth(user): Auth) -> Json<AuthenticatedUser> {
    Json(user)
}
