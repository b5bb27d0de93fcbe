// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors over the context the gate attaches to a request.
//!
//! Extractors never authenticate on their own; they only read what
//! `require_authenticated` / `require_admin` stored in request extensions:
//!
//! ```rust,ignore
//! async fn profile(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//!
//! async fn dashboard(AdminOnly(user, grant): AdminOnly) -> impl IntoResponse {
//!     // only reachable behind AuthGate::admin
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::error;

use super::reconcile::PrivilegeSource;
use super::{AuthError, AuthenticatedUser};

/// Marker inserted by `require_admin` once the caller has been reconciled as admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGrant {
    pub source: PrivilegeSource,
}

/// Extractor for authenticated callers.
///
/// Rejects with `MissingCredential` if the route is not behind the gate.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthenticatedUser>() {
            Some(user) => Ok(Auth(user.clone())),
            None => {
                error!(path = %parts.uri.path(), "Auth extractor used on a route without require_authenticated");
                Err(AuthError::MissingCredential)
            }
        }
    }
}

/// Extractor for reconciled admins.
///
/// Requires the [`AdminGrant`] marker, so a handler mounted outside
/// `AuthGate::admin` can never observe admin rights, whatever the cached flag says.
pub struct AdminOnly(pub AuthenticatedUser, pub AdminGrant);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        let grant = parts
            .extensions
            .get::<AdminGrant>()
            .copied()
            .ok_or(AuthError::InsufficientPrivileges)?;
        Ok(AdminOnly(user, grant))
    }
}
