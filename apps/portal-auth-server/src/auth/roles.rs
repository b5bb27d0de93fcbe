// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal roles carried in credential payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Informational portal role.
///
/// The role is display metadata only. Admin access is decided by the
/// `is_admin` flag and the privilege reconciler, never by `Role::Admin`.
///
/// - `Admin` - Portal administrator account
/// - `Student` - Self-registered student
/// - `User` - Any other authenticated account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator account
    Admin,
    /// Student account
    Student,
    /// Generic authenticated user
    User,
}

impl Role {
    /// Parse role from string (case-insensitive).
    ///
    /// Unknown values (e.g. the identity provider's `"authenticated"`) map to
    /// `User`.
    pub fn parse(s: &str) -> Role {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "student" => Role::Student,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::User => "user",
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege for authenticated accounts).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
