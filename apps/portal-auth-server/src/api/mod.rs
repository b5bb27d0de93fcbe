// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::{
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
        Components,
    },
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthMode, AuthenticatedUser, PrivilegeSource, ReconcilerSnapshot, Role},
    config::DEFAULT_COOKIE_NAME,
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;

/// Build the application router.
///
/// Sign-in routes depend on the deployment's auth mode; routes of the other
/// mode are not mounted.
pub fn router(state: AppState) -> Router {
    let gate = state.gate.clone();

    let public_routes = Router::new().route("/auth/logout", post(auth::logout));
    let public_routes = match state.mode() {
        AuthMode::Bearer => public_routes
            .route("/auth/login", post(auth::login))
            .route("/auth/refresh", post(auth::refresh)),
        AuthMode::CookieSession => public_routes.route("/auth/session", post(auth::create_session)),
    };

    let user_routes = gate.authenticated(Router::new().route("/users/me", get(users::get_current_user)));

    let admin_routes = gate.admin(
        Router::new()
            .route("/admin/overview", get(admin::get_overview))
            .route("/admin/sessions/{session_id}", delete(admin::delete_session)),
    );

    let v1_routes = public_routes
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::refresh,
        auth::create_session,
        auth::logout,
        users::get_current_user,
        admin::get_overview,
        admin::delete_session,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            AuthenticatedUser,
            AuthMode,
            PrivilegeSource,
            ReconcilerSnapshot,
            Role,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RefreshRequest,
            auth::AccessTokenResponse,
            auth::SessionResponse,
            users::UserMeResponse,
            admin::AdminOverviewResponse,
            health::HealthResponse,
            health::ReadyResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in, refresh and sign-out"),
        (name = "Users", description = "Current user"),
        (name = "Admin", description = "Admin-only operations"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::new);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(DEFAULT_COOKIE_NAME))),
        );
    }
}
