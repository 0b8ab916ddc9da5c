// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Two mutually exclusive auth gates, selected by `AUTH_MODE`.
//!
//! ## Token mode
//!
//! 1. Client exchanges login/password at `POST /auth/token`
//! 2. Client sends `Authorization: Bearer <token>`
//! 3. The gate:
//!    - Rejects any `alg` outside HS256/HS384/HS512
//!    - Verifies signature and expiry against the shared secret
//!    - Extracts `sub` → login and `role` → [`Role`]
//!
//! ## Session mode
//!
//! 1. Sender logs in with a form post to `/sender/login`
//! 2. Server stores a session record and sets an `HttpOnly` cookie with its id
//! 3. The gate loads the record per request; missing or expired means
//!    anonymous, handled per route by redirect or `403`
//!
//! Clock skew tolerance for tokens is 60 seconds. Passwords are hashed with
//! Argon2.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod roles;
pub mod session;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{Auth, CourierOnly, OptionalAuth, OptionalSession, SenderOnly, Session};
pub use jwt::TokenAuthority;
pub use roles::{Capability, Resource, Role};
