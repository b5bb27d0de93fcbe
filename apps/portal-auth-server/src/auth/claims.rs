// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential payloads and the authenticated request identity.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Credential variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    /// Short-lived credential presented on every request
    #[default]
    Access,
    /// Long-lived credential exchanged for a new access credential
    Refresh,
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialKind::Access => write!(f, "access"),
            CredentialKind::Refresh => write!(f, "refresh"),
        }
    }
}

fn default_role() -> String {
    Role::User.as_str().to_string()
}

/// Signed credential payload.
///
/// Immutable once issued: refreshing produces a new payload. Access tokens
/// minted by the hosted identity provider carry no `is_admin` or `type`
/// claim, so both default (to `false` and `access`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Subject (user ID)
    #[serde(rename = "sub")]
    pub subject_id: String,

    /// Account email
    #[serde(default)]
    pub email: String,

    /// Admin flag as known when the credential was issued
    #[serde(default)]
    pub is_admin: bool,

    /// Informational role
    #[serde(default = "default_role")]
    pub role: String,

    /// Issued at timestamp
    #[serde(rename = "iat", default)]
    pub issued_at: i64,

    /// Expiration timestamp
    #[serde(rename = "exp")]
    pub expires_at: i64,

    /// Access or refresh
    #[serde(rename = "type", default)]
    pub kind: CredentialKind,
}

/// Identity claims stamped into newly issued credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject_id: String,
    pub email: String,
    pub is_admin: bool,
    pub role: Role,
}

impl From<&TokenPayload> for IdentityClaims {
    fn from(payload: &TokenPayload) -> Self {
        Self {
            subject_id: payload.subject_id.clone(),
            email: payload.email.clone(),
            is_admin: payload.is_admin,
            role: Role::parse(&payload.role),
        }
    }
}

/// Authenticated caller attached to the request by the gate.
///
/// This is the primary type handlers use to represent the caller. `is_admin`
/// is the cached flag as resolved at authentication time; only a request
/// that passed `require_admin` has had it reconciled.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical subject ID
    pub subject_id: String,

    /// Account email
    pub email: String,

    /// Cached admin flag
    pub is_admin: bool,

    /// Informational role
    pub role: Role,

    /// Server session ID (cookie-session mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Access credential expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build from a verified access payload.
    ///
    /// `is_admin` comes from the payload in bearer mode and from the session
    /// record in cookie mode, so the caller passes it explicitly.
    pub fn from_payload(payload: &TokenPayload, is_admin: bool, session_id: Option<String>) -> Self {
        Self {
            subject_id: payload.subject_id.clone(),
            email: payload.email.clone(),
            is_admin,
            role: Role::parse(&payload.role),
            session_id,
            expires_at: payload.expires_at,
        }
    }
}
