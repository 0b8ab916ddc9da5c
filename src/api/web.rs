// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Browser routes served in session mode.
//!
//! Successful form posts answer `303 See Other`; failures answer with the
//! JSON error body.

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use cookie::Cookie;
use uuid::Uuid;

use super::accounts::credentials_valid;
use crate::{
    auth::{middleware::HOME_PATH, session, AuthError, OptionalSession, Session},
    error::ApiError,
    models::{DashboardResponse, IndexResponse, LabelForm, LabelView, LoginRequest},
    state::AppState,
    storage::{LabelRepository, NewLabel, RemoveOutcome},
    validation::{self, ValidationError},
};

pub const DASHBOARD_PATH: &str = "/sender/dashboard";

/// `303` to `location` that also sets `cookie`.
fn redirect_with_cookie(location: &str, cookie: Cookie<'static>) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
        tracing::error!(error = %e, "Session cookie is not a valid header value");
        ApiError::internal()
    })?;
    let mut response = Redirect::to(location).into_response();
    response.headers_mut().append(SET_COOKIE, value);
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Senders",
    responses((status = 200, body = IndexResponse))
)]
pub async fn index(OptionalSession(current): OptionalSession) -> Json<IndexResponse> {
    Json(IndexResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        logged_in_as: current.map(|s| s.record.login),
    })
}

/// Log a sender in and set the session cookie.
#[utoipa::path(
    post,
    path = "/sender/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    tag = "Senders",
    responses(
        (status = 303, description = "Logged in, session cookie set"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Form(request): Form<LoginRequest>,
) -> Result<Response, ApiError> {
    let login = request.login.clone();
    if !credentials_valid(&state, request).await? {
        tracing::info!(login = %login, "Rejected login");
        return Err(AuthError::InvalidCredentials.into());
    }

    let cookie = session::login(&state, &login).await?;
    redirect_with_cookie(HOME_PATH, cookie)
}

#[utoipa::path(
    post,
    path = "/sender/logout",
    tag = "Senders",
    responses((status = 303, description = "Session ended, cookie expired"))
)]
pub async fn logout(
    State(state): State<AppState>,
    Session(current): Session,
) -> Result<Response, ApiError> {
    let cookie = session::logout(&state, Some(current)).await?;
    redirect_with_cookie(HOME_PATH, cookie)
}

/// The sender's own labels.
#[utoipa::path(
    get,
    path = "/sender/dashboard",
    tag = "Senders",
    responses(
        (status = 200, body = DashboardResponse),
        (status = 303, description = "Not logged in, sent to /sender/login")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Session(current): Session,
) -> Result<Json<DashboardResponse>, ApiError> {
    let sender = current.record.login.clone();
    let labels = state
        .with_store(move |db| LabelRepository::new(db).list_by_sender(&sender))
        .await?;

    Ok(Json(DashboardResponse {
        login: current.record.login,
        login_time: current.record.login_time,
        labels: labels.into_iter().map(LabelView::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/sender/labels/create",
    request_body(content = LabelForm, content_type = "application/x-www-form-urlencoded"),
    tag = "Senders",
    responses(
        (status = 303, description = "Label stored, back to the dashboard"),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not logged in")
    )
)]
pub async fn create_label(
    State(state): State<AppState>,
    Session(current): Session,
    Form(form): Form<LabelForm>,
) -> Result<Redirect, ApiError> {
    let sender = current.record.login;
    let size = validation::parse_size(&form.size)?;
    validation::validate_label(&sender, &form.recipient, &form.locker, size)?;
    let size = u32::try_from(size).map_err(|_| ValidationError::InvalidSize)?;

    let draft = NewLabel {
        sender,
        recipient: form.recipient,
        locker: form.locker,
        size,
    };
    let label = state
        .with_store(move |db| LabelRepository::new(db).create(draft))
        .await?;
    tracing::info!(label_id = %label.id, sender = %label.sender, "Label created");

    Ok(Redirect::to(DASHBOARD_PATH))
}

#[utoipa::path(
    post,
    path = "/sender/labels/{id}/remove",
    params(("id" = String, Path, description = "Label id")),
    tag = "Senders",
    responses(
        (status = 303, description = "Label gone, back to the dashboard"),
        (status = 400, description = "Malformed label id"),
        (status = 403, description = "Not logged in"),
        (status = 409, description = "Label already assigned to a parcel")
    )
)]
pub async fn remove_label(
    State(state): State<AppState>,
    Session(current): Session,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ValidationError::InvalidLabelId)?;
    let sender = current.record.login;

    let outcome = state
        .with_store(move |db| LabelRepository::new(db).remove(&sender, &id))
        .await?;
    if outcome == RemoveOutcome::Removed {
        tracing::info!(label_id = %id, "Label removed");
    }

    Ok(Redirect::to(DASHBOARD_PATH))
}
