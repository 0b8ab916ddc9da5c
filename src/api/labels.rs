// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Label resources served in token mode.

use axum::{
    extract::{Path, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use super::hal::{options_response, Hal};
use crate::{
    auth::{Auth, AuthError, Capability, OptionalAuth, Resource, SenderOnly},
    error::ApiError,
    models::{
        CollectionLinks, CreateLabelRequest, EmbeddedLabels, LabelCollection, LabelResource, Link,
    },
    state::AppState,
    storage::{LabelRepository, NewLabel},
    validation::{self, ValidationError},
};

/// Senders see their own labels, couriers see every label.
#[utoipa::path(
    get,
    path = "/labels",
    tag = "Labels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = LabelCollection, content_type = "application/hal+json"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Role may not list labels")
    )
)]
pub async fn list_labels(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Hal<LabelCollection>, ApiError> {
    let labels = if user.can(Capability::ViewAllLabels) {
        state.with_store(|db| LabelRepository::new(db).list_all()).await?
    } else if user.can(Capability::ManageOwnLabels) {
        let sender = user.login.clone();
        state
            .with_store(move |db| LabelRepository::new(db).list_by_sender(&sender))
            .await?
    } else {
        return Err(AuthError::InsufficientPermissions.into());
    };

    let can_assign = user.can(Capability::CreateParcels);
    Ok(Hal(LabelCollection {
        embedded: EmbeddedLabels {
            labels: labels
                .into_iter()
                .map(|label| LabelResource::new(label, can_assign))
                .collect(),
        },
        links: CollectionLinks {
            self_link: Link::new("/labels"),
            labels: None,
            parcels: can_assign.then(|| Link::new("/parcels")),
        },
    }))
}

#[utoipa::path(
    post,
    path = "/labels",
    request_body = CreateLabelRequest,
    tag = "Labels",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = LabelResource, content_type = "application/hal+json"),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Only senders create labels")
    )
)]
pub async fn create_label(
    State(state): State<AppState>,
    SenderOnly(user): SenderOnly,
    Json(request): Json<CreateLabelRequest>,
) -> Result<Response, ApiError> {
    validation::validate_label(&user.login, &request.recipient, &request.locker, request.size)?;
    let size = u32::try_from(request.size).map_err(|_| ValidationError::InvalidSize)?;

    let draft = NewLabel {
        sender: user.login,
        recipient: request.recipient,
        locker: request.locker,
        size,
    };
    let label = state
        .with_store(move |db| LabelRepository::new(db).create(draft))
        .await?;
    tracing::info!(label_id = %label.id, sender = %label.sender, "Label created");

    let location = format!("/labels/{}", label.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Hal(LabelResource::new(label, false)),
    )
        .into_response())
}

/// A single label. Senders only see their own; someone else's label is
/// reported as missing.
#[utoipa::path(
    get,
    path = "/labels/{id}",
    params(("id" = String, Path, description = "Label id")),
    tag = "Labels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = LabelResource, content_type = "application/hal+json"),
        (status = 400, description = "Malformed label id"),
        (status = 404, description = "Label not found")
    )
)]
pub async fn get_label(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Hal<LabelResource>, ApiError> {
    if !user.can(Capability::ViewAllLabels) && !user.can(Capability::ManageOwnLabels) {
        return Err(AuthError::InsufficientPermissions.into());
    }
    let id = Uuid::parse_str(&id).map_err(|_| ValidationError::InvalidLabelId)?;

    let label = state
        .with_store(move |db| LabelRepository::new(db).get(&id))
        .await?;
    if !user.can(Capability::ViewAllLabels) && label.sender != user.login {
        return Err(ApiError::not_found(format!("Label {id} not found")));
    }

    Ok(Hal(LabelResource::new(label, user.can(Capability::CreateParcels))))
}

/// Remove one of the caller's labels. Unknown ids succeed without change.
#[utoipa::path(
    delete,
    path = "/labels/{id}",
    params(("id" = String, Path, description = "Label id")),
    tag = "Labels",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Label removed or already absent"),
        (status = 400, description = "Malformed label id"),
        (status = 409, description = "Label already assigned to a parcel")
    )
)]
pub async fn delete_label(
    State(state): State<AppState>,
    SenderOnly(user): SenderOnly,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ValidationError::InvalidLabelId)?;
    let outcome = state
        .with_store(move |db| LabelRepository::new(db).remove(&user.login, &id))
        .await?;
    tracing::debug!(label_id = %id, ?outcome, "Label removal");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn labels_options(OptionalAuth(user): OptionalAuth) -> Response {
    options_response(Resource::Labels, user.map(|u| u.role))
}

pub async fn label_options(OptionalAuth(user): OptionalAuth) -> Response {
    options_response(Resource::Label, user.map(|u| u.role))
}
