// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `application/hal+json` responses and `OPTIONS` answers.

use axum::{
    http::{
        header::{ALLOW, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{Resource, Role};

pub const HAL_JSON: &str = "application/hal+json";

/// JSON body served with the HAL media type.
pub struct Hal<T>(pub T);

impl<T: Serialize> IntoResponse for Hal<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.0).into_response();
        if response.status().is_success() {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(HAL_JSON));
        }
        response
    }
}

/// `204` with the methods the caller may use on `resource`.
pub fn options_response(resource: Resource, role: Option<Role>) -> Response {
    let allow = resource.allow_header(role);
    match HeaderValue::from_str(&allow) {
        Ok(value) => (StatusCode::NO_CONTENT, [(ALLOW, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Link;

    #[test]
    fn hal_sets_media_type() {
        let response = Hal(Link::new("/labels")).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], HAL_JSON);
    }

    #[test]
    fn options_lists_allowed_methods() {
        let response = options_response(Resource::Parcels, Some(Role::Courier));
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ALLOW], "GET, POST, OPTIONS");
    }
}
