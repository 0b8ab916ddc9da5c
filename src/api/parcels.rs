// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parcel resources served in token mode. Couriers only.

use axum::{
    extract::{Path, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use super::hal::{options_response, Hal};
use crate::{
    auth::{Auth, AuthError, Capability, CourierOnly, OptionalAuth, Resource},
    error::ApiError,
    models::{
        CollectionLinks, CreateParcelRequest, EmbeddedParcels, Link, ParcelCollection,
        ParcelResource, UpdateParcelRequest,
    },
    state::AppState,
    storage::{ParcelRepository, ParcelStatus},
    validation::{self, ValidationError},
};

#[utoipa::path(
    get,
    path = "/parcels",
    tag = "Parcels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ParcelCollection, content_type = "application/hal+json"),
        (status = 403, description = "Only couriers see parcels")
    )
)]
pub async fn list_parcels(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Hal<ParcelCollection>, ApiError> {
    if !user.can(Capability::ViewParcels) {
        return Err(AuthError::InsufficientPermissions.into());
    }

    let parcels = state
        .with_store(|db| ParcelRepository::new(db).list_all())
        .await?;

    Ok(Hal(ParcelCollection {
        embedded: EmbeddedParcels {
            parcels: parcels.into_iter().map(ParcelResource::from).collect(),
        },
        links: CollectionLinks {
            self_link: Link::new("/parcels"),
            labels: Some(Link::new("/labels")),
            parcels: None,
        },
    }))
}

/// Create a parcel from a free label.
#[utoipa::path(
    post,
    path = "/parcels",
    request_body = CreateParcelRequest,
    tag = "Parcels",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = ParcelResource, content_type = "application/hal+json"),
        (status = 400, description = "Malformed label id or status"),
        (status = 404, description = "Label not found"),
        (status = 409, description = "Label already assigned")
    )
)]
pub async fn create_parcel(
    State(state): State<AppState>,
    CourierOnly(courier): CourierOnly,
    Json(request): Json<CreateParcelRequest>,
) -> Result<Response, ApiError> {
    let (label_id, status) = validation::validate_parcel(&request.label_id, &request.status)?;

    let parcel = state
        .with_store(move |db| ParcelRepository::new(db).create(&label_id, status))
        .await?;
    tracing::info!(
        parcel_id = %parcel.id,
        label_id = %parcel.label_id,
        courier = %courier.login,
        "Parcel created"
    );

    let location = format!("/parcels/{}", parcel.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Hal(ParcelResource::from(parcel))).into_response())
}

#[utoipa::path(
    get,
    path = "/parcels/{id}",
    params(("id" = String, Path, description = "Parcel id")),
    tag = "Parcels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ParcelResource, content_type = "application/hal+json"),
        (status = 400, description = "Malformed parcel id"),
        (status = 404, description = "Parcel not found")
    )
)]
pub async fn get_parcel(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Hal<ParcelResource>, ApiError> {
    if !user.can(Capability::ViewParcels) {
        return Err(AuthError::InsufficientPermissions.into());
    }
    let id = parse_parcel_id(&id)?;

    let parcel = state
        .with_store(move |db| ParcelRepository::new(db).get(&id))
        .await?;
    Ok(Hal(ParcelResource::from(parcel)))
}

fn parse_parcel_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Niepoprawny identyfikator paczki"))
}

#[utoipa::path(
    put,
    path = "/parcels/{id}",
    params(("id" = String, Path, description = "Parcel id")),
    request_body = UpdateParcelRequest,
    tag = "Parcels",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ParcelResource, content_type = "application/hal+json"),
        (status = 400, description = "Malformed id or status"),
        (status = 404, description = "Parcel not found")
    )
)]
pub async fn update_parcel(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
    Json(request): Json<UpdateParcelRequest>,
) -> Result<Hal<ParcelResource>, ApiError> {
    if !user.can(Capability::UpdateParcels) {
        return Err(AuthError::InsufficientPermissions.into());
    }
    let id = parse_parcel_id(&id)?;
    let status = ParcelStatus::parse(&request.status).ok_or(ValidationError::InvalidStatus)?;

    let parcel = state
        .with_store(move |db| ParcelRepository::new(db).update_status(&id, status))
        .await?;
    tracing::info!(parcel_id = %parcel.id, status = %parcel.status, courier = %user.login, "Parcel status updated");

    Ok(Hal(ParcelResource::from(parcel)))
}

pub async fn parcels_options(OptionalAuth(user): OptionalAuth) -> Response {
    options_response(Resource::Parcels, user.map(|u| u.role))
}

pub async fn parcel_options(OptionalAuth(user): OptionalAuth) -> Response {
    options_response(Resource::Parcel, user.map(|u| u.role))
}
