// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated caller.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::{Capability, Role};

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject: the caller's login
    pub sub: String,

    /// Caller role
    pub role: Role,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Authenticated caller, attached to the request by the auth gate.
///
/// Produced from token claims in token mode and from the session record in
/// session mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub login: String,

    pub role: Role,

    /// Expiration of the credential (Unix seconds)
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            login: claims.sub,
            role: claims.role,
            expires_at: claims.exp,
        }
    }

    /// Check a capability of the caller's role.
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claims_maps_subject_and_role() {
        let user = AuthenticatedUser::from_claims(TokenClaims {
            sub: "alice".to_string(),
            role: Role::Courier,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        });
        assert_eq!(user.login, "alice");
        assert_eq!(user.role, Role::Courier);
        assert_eq!(user.expires_at, 1_700_003_600);
        assert!(user.can(Capability::UpdateParcels));
    }

    #[test]
    fn claims_use_lowercase_role() {
        let claims = TokenClaims {
            sub: "alice".to_string(),
            role: Role::Sender,
            iat: 0,
            exp: 1,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "sender");
        assert_eq!(json["sub"], "alice");
    }
}
