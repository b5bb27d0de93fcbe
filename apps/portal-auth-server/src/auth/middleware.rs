// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The request-level gate.
//!
//! Two middleware checks, meant to be stacked:
//!
//! - [`require_authenticated`]: extract the credential, decode it (bearer) or
//!   resolve and refresh the session (cookie), attach [`AuthenticatedUser`].
//!   In cookie mode the session cookie is re-issued on success and cleared on
//!   a rejection that calls for a fresh sign-in.
//! - [`require_admin`]: reconcile the attached user's admin flag, attach
//!   [`AdminGrant`] or answer 403.
//!
//! Use [`AuthGate::authenticated`] and [`AuthGate::admin`] rather than
//! layering by hand; they apply the layers in the only valid order.
//!
//! ```rust,ignore
//! let users = gate.authenticated(Router::new().route("/users/me", get(me)));
//! let admin = gate.admin(Router::new().route("/admin/overview", get(overview)));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Router,
};
use tracing::{debug, error};

use super::codec::TokenCodec;
use super::credentials::{extract_credential, AuthMode, CookieSettings, PresentedCredential};
use super::extractor::AdminGrant;
use super::reconcile::{PrivilegeReconciler, PrivilegeSource};
use super::refresh::RefreshOrchestrator;
use super::session::SessionStore;
use super::{AuthError, AuthenticatedUser, CredentialKind};
use crate::providers::{AdminStore, IdentityProvider};

/// Shared authentication state for one deployment profile.
#[derive(Clone)]
pub struct AuthGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    mode: AuthMode,
    cookie: CookieSettings,
    codec: Arc<TokenCodec>,
    sessions: Arc<SessionStore>,
    provider: Arc<dyn IdentityProvider>,
    refresher: RefreshOrchestrator,
    reconciler: PrivilegeReconciler,
}

impl AuthGate {
    pub fn new(
        mode: AuthMode,
        cookie: CookieSettings,
        codec: Arc<TokenCodec>,
        sessions: Arc<SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        admins: Arc<dyn AdminStore>,
    ) -> Self {
        let refresher = RefreshOrchestrator::new(codec.clone(), provider.clone(), sessions.clone());
        let reconciler = PrivilegeReconciler::new(admins, sessions.clone());
        Self {
            inner: Arc::new(GateInner {
                mode,
                cookie,
                codec,
                sessions,
                provider,
                refresher,
                reconciler,
            }),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.inner.mode
    }

    pub fn cookie(&self) -> &CookieSettings {
        &self.inner.cookie
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.inner.codec
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.inner.provider.as_ref()
    }

    pub fn reconciler(&self) -> &PrivilegeReconciler {
        &self.inner.reconciler
    }

    /// Resolve the caller presented in `headers`.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
        match extract_credential(headers, self.inner.mode, &self.inner.cookie.name)? {
            PresentedCredential::Bearer(token) => {
                let payload = self.inner.codec.decode_kind(&token, CredentialKind::Access)?;
                Ok(AuthenticatedUser::from_payload(&payload, payload.is_admin, None))
            }
            PresentedCredential::Session(id) => {
                let resolved = self.inner.refresher.resolve(&id).await?;
                debug!(session_id = %id, refreshed = resolved.refreshed, "Session resolved");
                Ok(AuthenticatedUser::from_payload(
                    &resolved.payload,
                    resolved.is_admin_cached,
                    Some(id.to_string()),
                ))
            }
        }
    }

    /// Decide admin access for an already authenticated caller.
    ///
    /// `None` means the authentication layer never ran; that is answered closed.
    pub async fn authorize_admin(&self, user: Option<&AuthenticatedUser>) -> Result<PrivilegeSource, AuthError> {
        let Some(user) = user else {
            error!("require_admin reached without an authenticated user; denying");
            return Err(AuthError::InsufficientPrivileges);
        };
        self.inner.reconciler.reconcile(user).await.into_result()
    }

    /// Put every route of `router` behind `require_authenticated`.
    pub fn authenticated<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(from_fn_with_state(self.clone(), require_authenticated))
    }

    /// Put every route of `router` behind `require_authenticated` then `require_admin`.
    pub fn admin<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // The layer added last runs first.
        router
            .route_layer(from_fn_with_state(self.clone(), require_admin))
            .route_layer(from_fn_with_state(self.clone(), require_authenticated))
    }
}

/// Middleware: 401 unless the request carries a valid credential.
pub async fn require_authenticated(State(gate): State<AuthGate>, mut request: Request, next: Next) -> Response {
    match gate.authenticate(request.headers()).await {
        Ok(user) => {
            debug!(subject_id = %user.subject_id, "Request authenticated");
            let session_id = user.session_id.clone();
            request.extensions_mut().insert(user);
            let mut response = next.run(request).await;
            if let Some(id) = session_id {
                set_cookie(&mut response, gate.cookie().issue(&id));
            }
            response
        }
        Err(e) => {
            debug!(path = %request.uri().path(), error_code = e.error_code(), "Authentication rejected");
            let clear = gate.mode() == AuthMode::CookieSession
                && e.requires_reauthentication()
                && e != AuthError::MissingCredential;
            let mut response = e.into_response();
            if clear {
                set_cookie(&mut response, gate.cookie().clear());
            }
            response
        }
    }
}

/// Attach a session cookie unless the handler already set one.
fn set_cookie(response: &mut Response, cookie: String) {
    if response.headers().contains_key(SET_COOKIE) {
        return;
    }
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(SET_COOKIE, value);
        }
        Err(e) => error!(error = %e, "Session cookie is not a valid header value"),
    }
}

/// Middleware: 403 unless the authenticated caller reconciles as admin.
pub async fn require_admin(State(gate): State<AuthGate>, mut request: Request, next: Next) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>().cloned();
    match gate.authorize_admin(user.as_ref()).await {
        Ok(source) => {
            if let Some(mut user) = user {
                user.is_admin = true;
                request.extensions_mut().insert(user);
            }
            request.extensions_mut().insert(AdminGrant { source });
            next.run(request).await
        }
        Err(e) => {
            debug!(path = %request.uri().path(), error_code = e.error_code(), "Admin access denied");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::auth::session::{SessionId, SessionRecord};
    use crate::auth::testing::{access_token, test_codec, FakeAdminStore, FakeIdentityProvider};
    use crate::auth::{AdminOnly, Auth};
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, header::COOKIE, StatusCode},
        routing::get,
        Json,
    };
    use tower::ServiceExt;

    const COOKIE_NAME: &str = "elearning_session";

    fn gate(mode: AuthMode, admins: Arc<FakeAdminStore>) -> AuthGate {
        AuthGate::new(
            mode,
            CookieSettings {
                name: COOKIE_NAME.to_string(),
                secure: true,
                max_age: Duration::from_secs(3600),
            },
            Arc::new(test_codec()),
            Arc::new(SessionStore::default()),
            Arc::new(FakeIdentityProvider::new(test_codec())),
            admins,
        )
    }

    async fn whoami(Auth(user): Auth) -> Json<AuthenticatedUser> {
        Json(user)
    }

    async fn admin_only(AdminOnly(user, _): AdminOnly) -> String {
        user.subject_id
    }

    fn app(gate: &AuthGate) -> Router {
        gate.authenticated(Router::new().route("/me", get(whoami)))
            .merge(gate.admin(Router::new().route("/admin", get(admin_only))))
    }

    fn get_with(uri: &str, header: Option<(axum::http::HeaderName, String)>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn error_code(response: Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["error_code"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn bearer_token_reaches_handler() {
        let gate = gate(AuthMode::Bearer, Arc::new(FakeAdminStore::new()));
        let token = access_token(gate.codec(), "student_1", "s@example.com", false);

        let response = app(&gate)
            .oneshot(get_with("/me", Some((AUTHORIZATION, format!("Bearer {token}")))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let user: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(user["subject_id"], "student_1");
        assert_eq!(user["is_admin"], false);
    }

    #[tokio::test]
    async fn admin_route_without_credentials_is_unauthorized() {
        let admins = Arc::new(FakeAdminStore::new());
        let gate = gate(AuthMode::Bearer, admins.clone());

        let response = app(&gate).oneshot(get_with("/admin", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "MissingCredential");
        assert_eq!(admins.calls(), 0);
    }

    #[tokio::test]
    async fn admin_claim_takes_fast_path() {
        let admins = Arc::new(FakeAdminStore::new());
        let gate = gate(AuthMode::Bearer, admins.clone());
        let token = access_token(gate.codec(), "admin_1", "a@example.com", true);

        let response = app(&gate)
            .oneshot(get_with("/admin", Some((AUTHORIZATION, format!("Bearer {token}")))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(admins.calls(), 0);
    }

    #[tokio::test]
    async fn degraded_store_is_forbidden() {
        let admins = Arc::new(FakeAdminStore::new().with_admin("admin_1"));
        admins.set_unavailable(true);
        let gate = gate(AuthMode::Bearer, admins.clone());
        let token = access_token(gate.codec(), "admin_1", "a@example.com", false);

        let response = app(&gate)
            .oneshot(get_with("/admin", Some((AUTHORIZATION, format!("Bearer {token}")))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_code(response).await, "PrivilegeCheckDegraded");
    }

    #[tokio::test]
    async fn require_admin_alone_fails_closed() {
        let gate = gate(AuthMode::Bearer, Arc::new(FakeAdminStore::new()));
        let app = Router::new()
            .route("/admin", get(|| async { "reached" }))
            .route_layer(from_fn_with_state(gate.clone(), require_admin));

        let mut request = get_with("/admin", None);
        request.extensions_mut().insert(AdminGrant {
            source: PrivilegeSource::CachedFlag,
        });
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_code(response).await, "InsufficientPrivileges");
    }

    #[tokio::test]
    async fn cookie_session_resolves_to_user() {
        let admins = Arc::new(FakeAdminStore::new());
        let gate = gate(AuthMode::CookieSession, admins.clone());
        let token = access_token(gate.codec(), "admin_1", "a@example.com", false);
        let id = gate
            .sessions()
            .create(SessionRecord::new("admin_1", true, token, None));

        let response = app(&gate)
            .oneshot(get_with("/admin", Some((COOKIE, format!("{COOKIE_NAME}={id}")))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let renewed = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(renewed.starts_with(&format!("{COOKIE_NAME}={id};")));
        assert!(renewed.contains("Max-Age=3600"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"admin_1");
        assert_eq!(admins.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_session_clears_cookie() {
        let gate = gate(AuthMode::CookieSession, Arc::new(FakeAdminStore::new()));
        let id = SessionId::generate();

        let response = app(&gate)
            .oneshot(get_with("/me", Some((COOKIE, format!("{COOKIE_NAME}={id}")))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let cleared = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cleared.starts_with(&format!("{COOKIE_NAME}=;")));
        assert!(cleared.contains("Max-Age=0"));
        assert_eq!(error_code(response).await, "SessionInvalidated");
    }

    #[tokio::test]
    async fn bearer_responses_carry_no_cookie() {
        let gate = gate(AuthMode::Bearer, Arc::new(FakeAdminStore::new()));
        let token = access_token(gate.codec(), "student_1", "s@example.com", false);

        let ok = app(&gate)
            .oneshot(get_with("/me", Some((AUTHORIZATION, format!("Bearer {token}")))))
            .await
            .unwrap();
        let rejected = app(&gate)
            .oneshot(get_with("/me", Some((AUTHORIZATION, "Bearer not-a-token".to_string()))))
            .await
            .unwrap();

        assert_eq!(ok.status(), StatusCode::OK);
        assert!(!ok.headers().contains_key(SET_COOKIE));
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert!(!rejected.headers().contains_key(SET_COOKIE));
    }

    #[tokio::test]
    async fn bearer_header_is_ignored_in_cookie_mode() {
        let gate = gate(AuthMode::CookieSession, Arc::new(FakeAdminStore::new()));
        let token = access_token(gate.codec(), "student_1", "s@example.com", false);

        let response = app(&gate)
            .oneshot(get_with("/me", Some((AUTHORIZATION, format!("Bearer {token}")))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "MissingCredential");
    }
}
