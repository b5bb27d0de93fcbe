// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every failure of the gate resolves to one of these. Handlers behind the
/// gate never see them: the middleware turns them into responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header or session cookie present
    MissingCredential,
    /// Header or cookie present but not in the expected shape
    MalformedCredential,
    /// Credential signature verified but `expires_at` has passed
    ExpiredCredential,
    /// Credential signature does not verify
    InvalidSignature,
    /// Identity provider refused to refresh the session credentials
    RefreshFailed,
    /// Session unknown, idle-expired or destroyed
    SessionInvalidated,
    /// Authenticated caller is not an admin
    InsufficientPrivileges,
    /// Admin store unreachable; resolved as not-admin
    PrivilegeCheckDegraded,
    /// Unexpected internal fault (detail is logged, never returned)
    InternalFault(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the machine-readable error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MissingCredential",
            AuthError::MalformedCredential => "MalformedCredential",
            AuthError::ExpiredCredential => "ExpiredCredential",
            AuthError::InvalidSignature => "InvalidSignature",
            AuthError::RefreshFailed => "RefreshFailed",
            AuthError::SessionInvalidated => "SessionInvalidated",
            AuthError::InsufficientPrivileges => "InsufficientPrivileges",
            AuthError::PrivilegeCheckDegraded => "PrivilegeCheckDegraded",
            AuthError::InternalFault(_) => "InternalFault",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::ExpiredCredential
            | AuthError::InvalidSignature
            | AuthError::RefreshFailed
            | AuthError::SessionInvalidated => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPrivileges | AuthError::PrivilegeCheckDegraded => {
                StatusCode::FORBIDDEN
            }
            AuthError::InternalFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller should re-authenticate (401) rather than give up (403).
    pub fn requires_reauthentication(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Authentication credentials are required"),
            AuthError::MalformedCredential => {
                write!(f, "Invalid credential format (expected 'Bearer <token>' or a session cookie)")
            }
            AuthError::ExpiredCredential => write!(f, "Credential has expired"),
            AuthError::InvalidSignature => write!(f, "Credential signature is invalid"),
            AuthError::RefreshFailed => write!(f, "Session has expired, please sign in again"),
            AuthError::SessionInvalidated => write!(f, "Session is no longer valid, please sign in again"),
            AuthError::InsufficientPrivileges | AuthError::PrivilegeCheckDegraded => {
                write!(f, "Admin access required")
            }
            AuthError::InternalFault(_) => write!(f, "Internal authentication error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AuthError::InternalFault(detail) = &self {
            tracing::error!(error_code = self.error_code(), detail = %detail, "Authentication internal fault");
        }
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
