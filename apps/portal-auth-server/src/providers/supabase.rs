// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supabase integration: GoTrue password/refresh grants and the `admins` table.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{AdminStore, AdminStoreError, IdentityProvider, ProviderError, ProviderSession, ProviderTokens};

const TOKEN_PATH: &str = "/auth/v1/token";
const ADMINS_PATH: &str = "/rest/v1/admins";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// HTTP client for a hosted Supabase project.
///
/// Auth endpoints use the anon key; admin lookups use the service-role key so
/// row-level security does not hide the `admins` table.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    service_role_key: String,
    http: Client,
}

impl SupabaseClient {
    pub fn new(
        base_url: impl Into<String>,
        service_role_key: impl Into<String>,
        anon_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let service_role_key = service_role_key.into();
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.unwrap_or_else(|| service_role_key.clone()),
            service_role_key,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<TokenResponse, ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, TOKEN_PATH))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, grant_type, "Identity provider rejected token grant");
            return Err(classify_token_status(status));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("invalid token response: {e}")))?;

        if token_response.access_token.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "token response did not include access_token".to_string(),
            ));
        }

        Ok(token_response)
    }
}

/// Map a failed token grant status to a provider error.
///
/// Client errors all collapse into `InvalidCredentials` so callers cannot tell
/// an unknown account from a wrong password.
fn classify_token_status(status: StatusCode) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::Unavailable(format!("token request returned {status}"))
        }
        s if s.is_client_error() => ProviderError::InvalidCredentials,
        _ => ProviderError::Unavailable(format!("token request returned {status}")),
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError> {
        let response = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;

        let user = response.user.ok_or_else(|| {
            ProviderError::InvalidResponse("password grant did not include user".to_string())
        })?;

        Ok(ProviderSession {
            subject_id: user.id,
            email: user.email.unwrap_or_else(|| email.to_string()),
            tokens: ProviderTokens {
                access_token: response.access_token,
                refresh_token: response.refresh_token,
            },
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, ProviderError> {
        let response = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;

        Ok(ProviderTokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        })
    }
}

#[async_trait]
impl AdminStore for SupabaseClient {
    async fn exists(&self, subject_id: &str) -> Result<bool, AdminStoreError> {
        let filter = format!("eq.{subject_id}");
        let response = self
            .http
            .get(format!("{}{}", self.base_url, ADMINS_PATH))
            .query(&[("select", "user_id"), ("user_id", filter.as_str()), ("limit", "1")])
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .send()
            .await
            .map_err(|e| AdminStoreError::Unavailable(format!("admin lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AdminStoreError::Unavailable(format!(
                "admin lookup returned {}",
                response.status()
            )));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| AdminStoreError::InvalidResponse(format!("admin lookup invalid JSON: {e}")))?;

        Ok(!rows.is_empty())
    }
}
