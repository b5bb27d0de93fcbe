// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AuthMode, ReconcilerSnapshot};
use crate::state::AppState;

/// Readiness response with authentication layer status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Credential presentation mode of this deployment.
    pub auth_mode: AuthMode,
    /// Live server-side sessions.
    pub live_sessions: usize,
    /// Privilege reconciliation counters.
    pub reconciler: ReconcilerSnapshot,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Reports "degraded" while the most recent admin lookup failed; the probe
/// still answers 200 since authentication keeps working without the store.
/// The cumulative counters are reported alongside.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> Json<ReadyResponse> {
    let reconciler = state.gate.reconciler().snapshot();
    Json(ReadyResponse {
        status: if reconciler.last_lookup_failed { "degraded" } else { "ok" }.to_string(),
        auth_mode: state.mode(),
        live_sessions: state.gate.sessions().len(),
        reconciler,
    })
}
