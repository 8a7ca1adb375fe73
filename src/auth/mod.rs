// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication for the custody API.
//!
//! ## Auth Flow
//!
//! 1. An upstream identity service issues an HS256 JWT
//! 2. Clients send `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - Verifies signature, expiry, and issuer (when configured)
//!    - Takes `sub` as the canonical `user_id`
//!    - Registers the user on first sight so wallet operations can find it
//!
//! ## Security
//!
//! - All `/v1` endpoints require authentication; health and docs do not
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
