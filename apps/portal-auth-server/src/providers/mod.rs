// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Collaborators
//!
//! The gate depends on two external services, injected as trait objects:
//!
//! - [`IdentityProvider`] - password sign-in and credential refresh
//! - [`AdminStore`] - the authoritative `admins` table
//!
//! [`SupabaseClient`] implements both against a hosted Supabase project.

use async_trait::async_trait;

pub mod supabase;

pub use supabase::SupabaseClient;

/// Errors returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Email/password or refresh token rejected. Never says which part was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("identity provider response was invalid: {0}")]
    InvalidResponse(String),
}

/// Errors returned by the admin store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminStoreError {
    #[error("admin store unavailable: {0}")]
    Unavailable(String),

    #[error("admin store response was invalid: {0}")]
    InvalidResponse(String),
}

/// Credential pair issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful password sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub subject_id: String,
    pub email: String,
    pub tokens: ProviderTokens,
}

/// Hosted identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password.
    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError>;

    /// Exchange a refresh token for a new credential pair.
    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, ProviderError>;
}

/// Authoritative record of which subjects are administrators.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Whether an admin row exists for the subject.
    async fn exists(&self, subject_id: &str) -> Result<bool, AdminStoreError>;
}
