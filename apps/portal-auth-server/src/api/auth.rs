// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in, token refresh and sign-out endpoints.
//!
//! Bearer deployments expose `/auth/login` and `/auth/refresh` and hand out
//! self-issued tokens. Cookie deployments expose `/auth/session`, which keeps
//! the identity provider's credentials server-side behind a session cookie.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::{
        credentials::extract_session_id, AuthError, AuthMode, AuthenticatedUser, CredentialKind,
        IdentityClaims, Role, SessionRecord,
    },
    error::ApiError,
    providers::ProviderSession,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(&str, &str), ApiError> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err(ApiError::bad_request("Email and password are required"));
        }
        Ok((email, self.password.as_str()))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Tokens issued at bearer-mode login.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `"bearer"`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    pub user: AuthenticatedUser,
}

/// Fresh access token for a valid refresh token.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Result of a cookie-session login; the session id travels in `Set-Cookie`.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: AuthenticatedUser,
    /// Idle lifetime of the session in seconds
    pub expires_in: u64,
}

async fn sign_in(state: &AppState, request: &LoginRequest) -> Result<(ProviderSession, bool, bool), ApiError> {
    let (email, password) = request.validate()?;
    let session = state.gate.provider().authenticate(email, password).await?;
    let lookup = state.gate.reconciler().lookup(&session.subject_id).await;
    Ok((session, lookup.unwrap_or(false), lookup.is_some()))
}

/// Sign in and receive bearer tokens.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid email or password"),
        (status = 503, description = "Identity provider unavailable")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (session, is_admin, _) = sign_in(&state, &request).await?;

    let codec = state.gate.codec();
    let claims = IdentityClaims {
        subject_id: session.subject_id,
        email: session.email,
        is_admin,
        role: if is_admin { Role::Admin } else { Role::User },
    };
    let access_token = codec.encode(&claims, CredentialKind::Access)?;
    let refresh_token = codec.encode(&claims, CredentialKind::Refresh)?;
    let payload = codec.decode(&access_token)?;

    info!(subject_id = %claims.subject_id, is_admin, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        expires_in: codec.access_ttl().as_secs(),
        user: AuthenticatedUser::from_payload(&payload, is_admin, None),
    }))
}

/// Exchange a refresh token for a new access token with the same claims.
///
/// An admin claim is carried over only if the admin store still confirms it;
/// a removed admin, or an unreachable store, yields a non-admin token.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Refresh token missing, expired or invalid")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AuthError> {
    let token = request.refresh_token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    let codec = state.gate.codec();
    let payload = codec.decode_kind(token, CredentialKind::Refresh)?;

    let mut claims = IdentityClaims::from(&payload);
    if claims.is_admin && state.gate.reconciler().lookup(&claims.subject_id).await != Some(true) {
        info!(subject_id = %claims.subject_id, "Admin claim not carried over at refresh");
        claims.is_admin = false;
        if claims.role == Role::Admin {
            claims.role = Role::User;
        }
    }
    let access_token = codec.encode(&claims, CredentialKind::Access)?;

    info!(subject_id = %claims.subject_id, is_admin = claims.is_admin, "Access token refreshed");

    Ok(Json(AccessTokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: codec.access_ttl().as_secs(),
    }))
}

/// Sign in and open a server-side session.
#[utoipa::path(
    post,
    path = "/v1/auth/session",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session created; cookie set", body = SessionResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid email or password"),
        (status = 503, description = "Identity provider unavailable")
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let (session, is_admin, reconciled) = sign_in(&state, &request).await?;

    let payload = state
        .gate
        .codec()
        .decode_kind(&session.tokens.access_token, CredentialKind::Access)
        .ok()
        .filter(|payload| payload.subject_id == session.subject_id)
        .ok_or_else(|| {
            warn!(subject_id = %session.subject_id, "Identity provider issued an access credential we cannot verify");
            ApiError::service_unavailable("Authentication service unavailable")
        })?;

    let mut record = SessionRecord::new(
        session.subject_id.clone(),
        is_admin,
        session.tokens.access_token,
        Some(session.tokens.refresh_token),
    );
    if reconciled {
        record.last_reconciled_at = Some(Utc::now());
    }
    let id = state.gate.sessions().create(record);

    info!(subject_id = %session.subject_id, session_id = %id, is_admin, "Session opened");

    let user = AuthenticatedUser::from_payload(&payload, is_admin, Some(id.to_string()));
    let body = SessionResponse {
        user,
        expires_in: state.cookie().max_age.as_secs(),
    };
    Ok(([(SET_COOKIE, state.cookie().issue(id.as_str()))], Json(body)).into_response())
}

/// Sign out.
///
/// Cookie deployments destroy the session and clear the cookie. Bearer tokens
/// cannot be revoked server-side, so bearer logout only acknowledges.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Signed out")
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.mode() {
        AuthMode::Bearer => StatusCode::NO_CONTENT.into_response(),
        AuthMode::CookieSession => {
            if let Ok(id) = extract_session_id(&headers, &state.cookie().name) {
                if state.gate.sessions().invalidate(&id).await {
                    info!(session_id = %id, "Session closed");
                }
            }
            (StatusCode::NO_CONTENT, [(SET_COOKIE, state.cookie().clear())]).into_response()
        }
    }
}
