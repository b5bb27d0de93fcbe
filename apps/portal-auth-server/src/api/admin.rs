// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! Mounted behind `AuthGate::admin`, so every handler here runs after the
//! caller's admin flag has been reconciled.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::{AdminOnly, AuthMode, PrivilegeSource, ReconcilerSnapshot, SessionId},
    error::ApiError,
    state::AppState,
};

/// Admin overview response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOverviewResponse {
    pub subject_id: String,
    pub email: String,
    /// How admin status was established for this request
    pub privilege_source: PrivilegeSource,
    pub auth_mode: AuthMode,
    /// Live server-side sessions (always 0 in bearer mode)
    pub live_sessions: usize,
    pub reconciler: ReconcilerSnapshot,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

/// Identity of the calling admin and authentication layer statistics.
#[utoipa::path(
    get,
    path = "/v1/admin/overview",
    tag = "Admin",
    security(("bearer" = []), ("session_cookie" = [])),
    responses(
        (status = 200, description = "Admin overview", body = AdminOverviewResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn get_overview(
    AdminOnly(user, grant): AdminOnly,
    State(state): State<AppState>,
) -> Json<AdminOverviewResponse> {
    Json(AdminOverviewResponse {
        subject_id: user.subject_id,
        email: user.email,
        privilege_source: grant.source,
        auth_mode: state.mode(),
        live_sessions: state.gate.sessions().len(),
        reconciler: state.gate.reconciler().snapshot(),
        uptime_seconds: state.uptime().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Destroy a session.
#[utoipa::path(
    delete,
    path = "/v1/admin/sessions/{session_id}",
    tag = "Admin",
    security(("bearer" = []), ("session_cookie" = [])),
    params(("session_id" = String, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session destroyed"),
        (status = 400, description = "Malformed session ID"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "No such session")
    )
)]
pub async fn delete_session(
    AdminOnly(user, _): AdminOnly,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = SessionId::parse(&session_id).ok_or_else(|| ApiError::bad_request("Malformed session ID"))?;

    if !state.gate.sessions().invalidate(&id).await {
        return Err(ApiError::not_found("Session not found"));
    }

    info!(admin_id = %user.subject_id, session_id = %id, "Session destroyed by admin");
    Ok(StatusCode::NO_CONTENT)
}
