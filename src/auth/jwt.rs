// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token issuing and verification.
//!
//! ## Security
//!
//! - One shared secret signs and verifies every token (HMAC)
//! - Only HS256, HS384 and HS512 are accepted; the `alg` header is checked
//!   against this allow-list before any signature work
//! - Clock skew tolerance is 60 seconds

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{AuthenticatedUser, TokenClaims};
use super::error::AuthError;
use super::roles::Role;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Algorithm used for tokens issued by this service.
const ISSUE_ALGORITHM: Algorithm = Algorithm::HS256;

/// Accepted signing algorithms (HMAC family).
const ALLOWED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Issues and verifies bearer tokens with a shared secret.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenAuthority {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(ISSUE_ALGORITHM);
        validation.algorithms = ALLOWED_ALGORITHMS.to_vec();
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `login` with `role`, valid for the configured TTL.
    pub fn issue(&self, login: &str, role: Role) -> Result<(String, TokenClaims), AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            sub: login.to_owned(),
            role,
            iat: now,
            exp: now.saturating_add(ttl),
        };
        let token = self.sign(&claims, ISSUE_ALGORITHM)?;
        Ok((token, claims))
    }

    /// Sign arbitrary claims. `algorithm` must be one of the HMAC family.
    pub fn sign(&self, claims: &TokenClaims, algorithm: Algorithm) -> Result<String, AuthError> {
        encode(&Header::new(algorithm), claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign token");
            AuthError::InternalError(e.to_string())
        })
    }

    /// Verify a token and return the caller it identifies.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::DisallowedAlgorithm);
        }

        let token_data = decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                ErrorKind::InvalidAlgorithm => AuthError::DisallowedAlgorithm,
                _ => AuthError::MalformedToken,
            })?;

        Ok(AuthenticatedUser::from_claims(token_data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn authority() -> TokenAuthority {
        TokenAuthority::new(b"test-secret", Duration::from_secs(3600))
    }

    fn claims(exp_offset: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: "alice".to_string(),
            role: Role::Courier,
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let authority = authority();
        let (token, claims) = authority.issue("alice", Role::Sender).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);

        let user = authority.verify(&token).unwrap();
        assert_eq!(user.login, "alice");
        assert_eq!(user.role, Role::Sender);
        assert_eq!(user.expires_at, claims.exp);
    }

    #[test]
    fn whole_hmac_family_is_accepted() {
        let authority = authority();
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = authority.sign(&claims(600), alg).unwrap();
            assert_eq!(authority.verify(&token).unwrap().role, Role::Courier);
        }
    }

    #[test]
    fn other_secret_is_rejected() {
        let (token, _) = authority().issue("alice", Role::Sender).unwrap();
        let other = TokenAuthority::new(b"other-secret", Duration::from_secs(60));
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn expired_token_is_rejected_after_leeway() {
        let authority = authority();
        let token = authority.sign(&claims(-600), Algorithm::HS256).unwrap();
        assert!(matches!(authority.verify(&token), Err(AuthError::TokenExpired)));

        // Within the clock skew tolerance.
        let token = authority.sign(&claims(-10), Algorithm::HS256).unwrap();
        assert!(authority.verify(&token).is_ok());
    }

    #[test]
    fn non_hmac_algorithm_is_rejected() {
        let authority = authority();
        let valid = authority.sign(&claims(600), Algorithm::HS256).unwrap();
        let mut parts = valid.splitn(2, '.');
        let _ = parts.next();
        let rest = parts.next().unwrap();

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let forged = format!("{header}.{rest}");
        assert!(matches!(authority.verify(&forged), Err(AuthError::DisallowedAlgorithm)));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"alice","role":"courier","iat":0,"exp":9999999999}"#);
        let token = format!("{header}.{payload}.");
        assert!(authority().verify(&token).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(authority().verify("not.a.jwt"), Err(AuthError::MalformedToken)));
        assert!(matches!(authority().verify(""), Err(AuthError::MalformedToken)));
    }
}
