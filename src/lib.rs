// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Parcel Locker - sender and courier service
//!
//! Senders register, log in and create shipping labels addressed to a
//! locker. Couriers turn labels into parcels and move them through
//! `on_the_way`, `delivered` and `received`.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and routing (Axum)
//! - `auth` - Password hashing, cookie sessions and bearer tokens
//! - `storage` - Users, labels, parcels and sessions in redb
//! - `validation` - Input rules for users, labels and parcels

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod validation;
