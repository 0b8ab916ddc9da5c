// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        middleware::{
            anonymous_only, optional_session, optional_token, require_session_forbid,
            require_session_redirect, require_token,
        },
        AuthenticatedUser, Role,
    },
    config::{AppConfig, AuthMode},
    models::{
        CreateLabelRequest, CreateParcelRequest, DashboardResponse, IndexResponse, LabelCollection,
        LabelForm, LabelResource, LoginRequest, ParcelCollection, ParcelResource, RegisterRequest,
        RegisteredResponse, TokenResponse, UpdateParcelRequest,
    },
    state::AppState,
    storage::ParcelStatus,
};

pub mod accounts;
pub mod cors;
pub mod hal;
pub mod health;
pub mod labels;
pub mod parcels;
pub mod web;

/// Build the application for the configured auth mode.
pub fn router(state: AppState, config: &AppConfig) -> Router {
    let shared = Router::new()
        .route("/health", get(health::health))
        .route("/check/{login}", get(accounts::check_availability));

    let routes = match config.auth_mode {
        AuthMode::Session => shared.merge(session_routes(&state)),
        AuthMode::Token => shared.merge(token_routes(&state)),
    };

    routes
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", openapi(config.auth_mode)))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(from_fn_with_state(cors::cors_layer(config), cors::cors))
}

fn session_routes(state: &AppState) -> Router<AppState> {
    let home = Router::new()
        .route("/", get(web::index))
        .route_layer(from_fn_with_state(state.clone(), optional_session));

    let anonymous = Router::new()
        .route("/sender/register", post(accounts::register_form))
        .route("/sender/login", post(web::login))
        .route_layer(from_fn_with_state(state.clone(), anonymous_only));

    let pages = Router::new()
        .route("/sender/logout", get(web::logout).post(web::logout))
        .route("/sender/dashboard", get(web::dashboard))
        .route_layer(from_fn_with_state(state.clone(), require_session_redirect));

    let actions = Router::new()
        .route("/sender/labels/create", post(web::create_label))
        .route("/sender/labels/{id}/remove", post(web::remove_label))
        .route_layer(from_fn_with_state(state.clone(), require_session_forbid));

    home.merge(anonymous).merge(pages).merge(actions)
}

fn token_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/sender/register", post(accounts::register_json))
        .route("/auth/token", post(accounts::issue_token));

    let identity = Router::new()
        .route("/auth/me", get(accounts::me))
        .route_layer(from_fn_with_state(state.clone(), require_token));

    // Handlers decide per method; OPTIONS stays open to anonymous callers.
    let resources = Router::new()
        .route(
            "/labels",
            get(labels::list_labels)
                .post(labels::create_label)
                .options(labels::labels_options),
        )
        .route(
            "/labels/{id}",
            get(labels::get_label)
                .delete(labels::delete_label)
                .options(labels::label_options),
        )
        .route(
            "/parcels",
            get(parcels::list_parcels)
                .post(parcels::create_parcel)
                .options(parcels::parcels_options),
        )
        .route(
            "/parcels/{id}",
            get(parcels::get_parcel)
                .put(parcels::update_parcel)
                .options(parcels::parcel_options),
        )
        .route_layer(from_fn_with_state(state.clone(), optional_token));

    public.merge(identity).merge(resources)
}

fn openapi(mode: AuthMode) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    match mode {
        AuthMode::Session => doc.merge(SessionApiDoc::openapi()),
        AuthMode::Token => doc.merge(TokenApiDoc::openapi()),
    }
    doc
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Parcel Locker", description = "Senders, labels and parcels"),
    paths(health::health, accounts::check_availability),
    tags(
        (name = "Health", description = "Liveness and store reachability"),
        (name = "Senders", description = "Registration and the sender dashboard"),
        (name = "Auth", description = "Bearer token exchange"),
        (name = "Labels", description = "Shipping labels"),
        (name = "Parcels", description = "Parcels created by couriers")
    )
)]
struct ApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        web::index,
        accounts::register_form,
        web::login,
        web::logout,
        web::dashboard,
        web::create_label,
        web::remove_label
    ),
    components(schemas(RegisterRequest, LoginRequest, LabelForm, DashboardResponse, IndexResponse))
)]
struct SessionApiDoc;

#[derive(OpenApi)]
#[openapi(
    paths(
        accounts::register_json,
        accounts::issue_token,
        accounts::me,
        labels::list_labels,
        labels::create_label,
        labels::get_label,
        labels::delete_label,
        parcels::list_parcels,
        parcels::create_parcel,
        parcels::get_parcel,
        parcels::update_parcel
    ),
    components(schemas(
        RegisterRequest,
        RegisteredResponse,
        LoginRequest,
        TokenResponse,
        AuthenticatedUser,
        Role,
        CreateLabelRequest,
        LabelResource,
        LabelCollection,
        CreateParcelRequest,
        UpdateParcelRequest,
        ParcelResource,
        ParcelCollection,
        ParcelStatus
    )),
    modifiers(&BearerAuth)
)]
struct TokenApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
