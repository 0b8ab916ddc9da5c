// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller roles and the capabilities they grant.

use axum::http::Method;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller roles.
///
/// ## Capabilities
///
/// | Capability        | Sender | Courier |
/// |-------------------|--------|---------|
/// | `ManageOwnLabels` | yes    | no      |
/// | `ViewAllLabels`   | no     | yes     |
/// | `ViewParcels`     | no     | yes     |
/// | `CreateParcels`   | no     | yes     |
/// | `UpdateParcels`   | no     | yes     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registered sender creating labels for their own shipments
    Sender,
    /// Courier turning labels into parcels and tracking them
    Courier,
}

/// Individual permissions checked by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create, list and remove labels where `sender` is the caller
    ManageOwnLabels,
    /// List labels of every sender
    ViewAllLabels,
    ViewParcels,
    /// Assign a parcel to a label
    CreateParcels,
    UpdateParcels,
}

/// Resources whose allowed methods depend on the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Labels,
    Label,
    Parcels,
    Parcel,
}

impl Role {
    /// Whether this role grants `capability`.
    pub fn can(&self, capability: Capability) -> bool {
        match self {
            Role::Sender => matches!(capability, Capability::ManageOwnLabels),
            Role::Courier => !matches!(capability, Capability::ManageOwnLabels),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Courier => "courier",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Resource {
    /// Methods the caller may use on this resource. `OPTIONS` is always
    /// allowed, including for anonymous callers.
    pub fn allowed_methods(&self, role: Option<Role>) -> Vec<Method> {
        let can = |capability| role.is_some_and(|r| r.can(capability));

        let mut methods = Vec::new();
        match self {
            Resource::Labels => {
                if can(Capability::ManageOwnLabels) || can(Capability::ViewAllLabels) {
                    methods.push(Method::GET);
                }
                if can(Capability::ManageOwnLabels) {
                    methods.push(Method::POST);
                }
            }
            Resource::Label => {
                if can(Capability::ManageOwnLabels) || can(Capability::ViewAllLabels) {
                    methods.push(Method::GET);
                }
                if can(Capability::ManageOwnLabels) {
                    methods.push(Method::DELETE);
                }
            }
            Resource::Parcels => {
                if can(Capability::ViewParcels) {
                    methods.push(Method::GET);
                }
                if can(Capability::CreateParcels) {
                    methods.push(Method::POST);
                }
            }
            Resource::Parcel => {
                if can(Capability::ViewParcels) {
                    methods.push(Method::GET);
                }
                if can(Capability::UpdateParcels) {
                    methods.push(Method::PUT);
                }
            }
        }
        methods.push(Method::OPTIONS);
        methods
    }

    /// `Allow` header value for the caller.
    pub fn allow_header(&self, role: Option<Role>) -> String {
        self.allowed_methods(role)
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_only_manages_own_labels() {
        assert!(Role::Sender.can(Capability::ManageOwnLabels));
        assert!(!Role::Sender.can(Capability::ViewAllLabels));
        assert!(!Role::Sender.can(Capability::ViewParcels));
        assert!(!Role::Sender.can(Capability::CreateParcels));
        assert!(!Role::Sender.can(Capability::UpdateParcels));
    }

    #[test]
    fn courier_handles_parcels() {
        assert!(!Role::Courier.can(Capability::ManageOwnLabels));
        assert!(Role::Courier.can(Capability::ViewAllLabels));
        assert!(Role::Courier.can(Capability::ViewParcels));
        assert!(Role::Courier.can(Capability::CreateParcels));
        assert!(Role::Courier.can(Capability::UpdateParcels));
    }

    #[test]
    fn roles_travel_in_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Courier).unwrap(), r#""courier""#);
        assert_eq!(
            serde_json::from_str::<Role>(r#""sender""#).unwrap(),
            Role::Sender
        );
        assert!(serde_json::from_str::<Role>(r#""admin""#).is_err());
        assert_eq!(Role::Sender.to_string(), Role::Sender.as_str());
    }

    #[test]
    fn allow_header_per_role() {
        assert_eq!(Resource::Labels.allow_header(Some(Role::Sender)), "GET, POST, OPTIONS");
        assert_eq!(Resource::Labels.allow_header(Some(Role::Courier)), "GET, OPTIONS");
        assert_eq!(Resource::Labels.allow_header(None), "OPTIONS");
        assert_eq!(Resource::Label.allow_header(Some(Role::Sender)), "GET, DELETE, OPTIONS");
        assert_eq!(Resource::Label.allow_header(Some(Role::Courier)), "GET, OPTIONS");
        assert_eq!(Resource::Parcels.allow_header(Some(Role::Courier)), "GET, POST, OPTIONS");
        assert_eq!(Resource::Parcels.allow_header(Some(Role::Sender)), "OPTIONS");
        assert_eq!(Resource::Parcel.allow_header(Some(Role::Courier)), "GET, PUT, OPTIONS");
    }
}
