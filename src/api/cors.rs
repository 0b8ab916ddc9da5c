// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-origin handling.
//!
//! `CorsLayer` treats every `OPTIONS` request as a preflight and answers it
//! itself. Plain `OPTIONS` requests carry the role-aware `Allow` header from
//! the resource handlers, so only real preflights (an `Origin` together with
//! `Access-Control-Request-Method`) are handed to the CORS service here.

use std::convert::Infallible;

use axum::{
    extract::{Request, State},
    http::{
        header::{ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};
use tower::{service_fn, Layer, ServiceExt};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::{AppConfig, AuthMode};

/// CORS policy for the configured origins.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    match config.auth_mode {
        AuthMode::Session => layer.allow_credentials(true),
        AuthMode::Token => layer,
    }
}

/// Whether the request is a CORS preflight rather than a plain `OPTIONS`.
pub fn is_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(ORIGIN)
        && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// Apply `layer` to everything except plain `OPTIONS` requests.
pub async fn cors(State(layer): State<CorsLayer>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS && !is_preflight(&request) {
        return next.run(request).await;
    }

    let inner = service_fn(move |request: Request| {
        let next = next.clone();
        async move { Ok::<_, Infallible>(next.run(request).await) }
    });
    match layer.layer(inner).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{
            header::{ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW},
            StatusCode,
        },
        middleware::from_fn_with_state,
        response::IntoResponse,
        routing::get,
        Router,
    };

    const ORIGIN_URL: &str = "https://parcels.example";

    fn config(origins: &[&str]) -> AppConfig {
        AppConfig {
            auth_mode: AuthMode::Token,
            allowed_origins: origins.iter().map(|o| o.to_string()).collect(),
            ..AppConfig::default()
        }
    }

    fn app(config: &AppConfig) -> Router {
        Router::new()
            .route(
                "/things",
                get(|| async { "things" }).options(|| async {
                    (StatusCode::NO_CONTENT, [(ALLOW, "GET, OPTIONS")]).into_response()
                }),
            )
            .layer(from_fn_with_state(cors_layer(config), cors))
    }

    fn request(method: Method, headers: &[(&'static str, &str)]) -> Request {
        let mut builder = Request::builder().method(method).uri("/things");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn plain_options_reaches_the_handler() {
        let response = app(&config(&[ORIGIN_URL]))
            .oneshot(request(Method::OPTIONS, &[]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ALLOW], "GET, OPTIONS");
    }

    #[tokio::test]
    async fn options_with_origin_only_reaches_the_handler() {
        let response = app(&config(&[ORIGIN_URL]))
            .oneshot(request(Method::OPTIONS, &[("origin", ORIGIN_URL)]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ALLOW], "GET, OPTIONS");
    }

    #[tokio::test]
    async fn preflight_is_answered_by_cors() {
        let response = app(&config(&[ORIGIN_URL]))
            .oneshot(request(
                Method::OPTIONS,
                &[("origin", ORIGIN_URL), ("access-control-request-method", "POST")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN_URL);
        assert!(response.headers().get(ALLOW).is_none());
    }

    #[tokio::test]
    async fn simple_requests_still_get_cors_headers() {
        let response = app(&config(&[ORIGIN_URL]))
            .oneshot(request(Method::GET, &[("origin", ORIGIN_URL)]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN_URL);
    }

    #[tokio::test]
    async fn unknown_origin_gets_no_allow_origin() {
        let response = app(&config(&[ORIGIN_URL]))
            .oneshot(request(Method::GET, &[("origin", "https://elsewhere.example")]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
