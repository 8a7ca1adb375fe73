// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, Validation};

use super::claims::TokenClaims;
use super::{AuthError, AuthenticatedUser};
use crate::state::{AppState, AuthConfig};
use crate::storage::UserRepository;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
///
/// Validates the bearer token and makes sure the user has a record, so the
/// wallet core can rely on the owner existing.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token, &state.auth_config)?;

        UserRepository::new(&state.db)
            .ensure(&user.user_id)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Verify an HS256 token and extract the user.
fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_aud = false;
    if let Some(ref issuer) = auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    let token_data = decode::<TokenClaims>(token, &auth_config.decoding_key, &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AuthError::MissingSubject);
    }
    // NUL separates owner scopes in the storage indexes.
    if token_data.claims.sub.contains('\0') {
        return Err(AuthError::InvalidSubject);
    }

    Ok(AuthenticatedUser::from_claims(token_data.claims))
}
