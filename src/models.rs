// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures of the HTTP surface. All types derive
//! `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Accounts**: registration, login, token exchange
//! - **Labels**: form and JSON input, HAL resources
//! - **Parcels**: assignment and status input, HAL resources
//!
//! Resources served in token mode follow HAL: links live under `_links`,
//! embedded collections under `_embedded`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;
use crate::storage::{ParcelStatus, StoredLabel, StoredParcel};

// =============================================================================
// Accounts
// =============================================================================

/// Sender registration, accepted as a form or as JSON.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
    /// Must equal `password` when present.
    #[serde(default)]
    pub password_confirmation: Option<String>,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredResponse {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    pub service: String,
    /// Login of the session owner, absent for anonymous visitors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_in_as: Option<String>,
}

// =============================================================================
// Labels
// =============================================================================

/// Label form posted from the sender dashboard. `size` is raw form text.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LabelForm {
    pub recipient: String,
    pub locker: String,
    pub size: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLabelRequest {
    pub recipient: String,
    pub locker: String,
    pub size: i64,
}

/// Label as listed on the sender dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelView {
    pub id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub locker: String,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_parcel: Option<Uuid>,
}

impl From<StoredLabel> for LabelView {
    fn from(label: StoredLabel) -> Self {
        Self {
            id: label.id,
            sender: label.sender,
            recipient: label.recipient,
            locker: label.locker,
            size: label.size,
            assigned_parcel: label.assigned_parcel,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub login: String,
    pub login_time: DateTime<Utc>,
    pub labels: Vec<LabelView>,
}

// =============================================================================
// Parcels
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateParcelRequest {
    pub label_id: String,
    /// `on_the_way`, `delivered` or `received`
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateParcelRequest {
    pub status: String,
}

// =============================================================================
// HAL
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Link {
    pub href: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self { href: href.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LabelLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    /// Where a courier posts to create a parcel from this label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign: Option<Link>,
    /// Parcel created from this label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel: Option<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelResource {
    #[serde(flatten)]
    pub label: LabelView,
    #[serde(rename = "_links")]
    pub links: LabelLinks,
}

impl LabelResource {
    /// `assign` is offered only to callers who may create parcels, and only
    /// while the label is free.
    pub fn new(label: StoredLabel, can_assign: bool) -> Self {
        let self_link = Link::new(format!("/labels/{}", label.id));
        let assign = (can_assign && label.assigned_parcel.is_none()).then(|| Link::new("/parcels"));
        let parcel = label
            .assigned_parcel
            .map(|id| Link::new(format!("/parcels/{id}")));
        Self {
            label: label.into(),
            links: LabelLinks {
                self_link,
                assign,
                parcel,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParcelLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    pub label: Link,
    pub parcels: Link,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParcelResource {
    pub id: Uuid,
    pub label_id: Uuid,
    pub status: ParcelStatus,
    #[serde(rename = "_links")]
    pub links: ParcelLinks,
}

impl From<StoredParcel> for ParcelResource {
    fn from(parcel: StoredParcel) -> Self {
        Self {
            links: ParcelLinks {
                self_link: Link::new(format!("/parcels/{}", parcel.id)),
                label: Link::new(format!("/labels/{}", parcel.label_id)),
                parcels: Link::new("/parcels"),
            },
            id: parcel.id,
            label_id: parcel.label_id,
            status: parcel.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcels: Option<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmbeddedLabels {
    pub labels: Vec<LabelResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LabelCollection {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedLabels,
    #[serde(rename = "_links")]
    pub links: CollectionLinks,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmbeddedParcels {
    pub parcels: Vec<ParcelResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParcelCollection {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedParcels,
    #[serde(rename = "_links")]
    pub links: CollectionLinks,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_label(assigned: Option<Uuid>) -> StoredLabel {
        StoredLabel {
            id: Uuid::nil(),
            sender: "alice".into(),
            recipient: "Bob".into(),
            locker: "WAW01ABCD".into(),
            size: 5,
            assigned_parcel: assigned,
        }
    }

    #[test]
    fn label_resource_is_hal_shaped() {
        let json = serde_json::to_value(LabelResource::new(stored_label(None), true)).unwrap();
        assert_eq!(json["id"], Uuid::nil().to_string());
        assert_eq!(json["sender"], "alice");
        assert_eq!(json["_links"]["self"]["href"], format!("/labels/{}", Uuid::nil()));
        assert_eq!(json["_links"]["assign"]["href"], "/parcels");
        assert!(json.get("assignedParcel").is_none());
    }

    #[test]
    fn assigned_label_has_no_assign_link() {
        let parcel = Uuid::new_v4();
        let json = serde_json::to_value(LabelResource::new(stored_label(Some(parcel)), true)).unwrap();
        assert!(json["_links"].get("assign").is_none());
        assert_eq!(json["_links"]["parcel"]["href"], format!("/parcels/{parcel}"));
        assert_eq!(json["assignedParcel"], parcel.to_string());
    }

    #[test]
    fn senders_never_see_assign_link() {
        let json = serde_json::to_value(LabelResource::new(stored_label(None), false)).unwrap();
        assert!(json["_links"].get("assign").is_none());
    }

    #[test]
    fn parcel_resource_links_back_to_label() {
        let parcel = StoredParcel {
            id: Uuid::new_v4(),
            label_id: Uuid::nil(),
            status: ParcelStatus::Delivered,
        };
        let json = serde_json::to_value(ParcelResource::from(parcel.clone())).unwrap();
        assert_eq!(json["labelId"], Uuid::nil().to_string());
        assert_eq!(json["status"], "delivered");
        assert_eq!(json["_links"]["self"]["href"], format!("/parcels/{}", parcel.id));
        assert_eq!(json["_links"]["label"]["href"], format!("/labels/{}", Uuid::nil()));
    }

    #[test]
    fn register_request_accepts_camel_case_confirmation() {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "login": "alice",
            "password": "secret12",
            "passwordConfirmation": "secret12",
            "email": "a@b.com",
            "firstname": "Alice",
            "lastname": "Doe",
            "address": "Main St"
        }))
        .unwrap();
        assert_eq!(request.password_confirmation.as_deref(), Some("secret12"));
    }
}
