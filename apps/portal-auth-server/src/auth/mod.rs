// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Identity validation and admin-privilege reconciliation for the portal API.
//!
//! ## Auth Flow
//!
//! 1. [`credentials`] pulls the credential off the request: a bearer access
//!    token, or a session cookie (one mode per deployment)
//! 2. [`codec`] verifies HS256 signature and expiry
//! 3. Cookie mode only: [`refresh`] resolves the session and, if the access
//!    credential has expired, performs exactly one refresh with the identity
//!    provider
//! 4. [`middleware::require_authenticated`] attaches [`AuthenticatedUser`]
//! 5. Admin routes: [`middleware::require_admin`] runs [`reconcile`] against
//!    the `admins` table
//!
//! ## Security
//!
//! - Any authentication failure is a 401; 403 means "valid caller, not admin"
//! - Admin store failures fail closed (403, cache untouched, logged at warn)
//! - A cached admin flag of `true` is trusted without a lookup
//! - No clock skew leeway on expiry

pub mod claims;
pub mod codec;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod reconcile;
pub mod refresh;
pub mod roles;
pub mod session;

#[cfg(test)]
pub mod testing;

pub use claims::{AuthenticatedUser, CredentialKind, IdentityClaims, TokenPayload};
pub use codec::TokenCodec;
pub use credentials::{AuthMode, CookieSettings};
pub use error::AuthError;
pub use extractor::{AdminGrant, AdminOnly, Auth};
pub use middleware::AuthGate;
pub use reconcile::{PrivilegeReconciler, PrivilegeSource, ReconcilerSnapshot};
pub use roles::Role;
pub use session::{SessionId, SessionRecord, SessionStore};
