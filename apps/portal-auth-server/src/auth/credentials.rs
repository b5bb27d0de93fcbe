// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbound credential extraction.
//!
//! A deployment accepts exactly one presentation mode: a bearer access token
//! in the `Authorization` header, or an opaque session id in a cookie.

use std::time::Duration;

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::AuthError;
use super::session::SessionId;

/// How callers present credentials in this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// `Authorization: Bearer <access_token>`, no server session
    Bearer,
    /// Session cookie resolving to a server-held session record
    CookieSession,
}

impl AuthMode {
    /// Parse from configuration (`bearer` or `cookie`).
    pub fn parse(value: &str) -> Option<AuthMode> {
        match value.trim().to_lowercase().as_str() {
            "bearer" => Some(AuthMode::Bearer),
            "cookie" | "cookie_session" | "session" => Some(AuthMode::CookieSession),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Bearer => write!(f, "bearer"),
            AuthMode::CookieSession => write!(f, "cookie_session"),
        }
    }
}

/// Session cookie attributes.
///
/// `max_age` mirrors the server's idle timeout; the gate re-issues the cookie
/// on every authenticated request so the browser's expiry slides with it.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub max_age: Duration,
}

impl CookieSettings {
    /// `Set-Cookie` value carrying `value`.
    pub fn issue(&self, value: &str) -> String {
        self.render(value, self.max_age.as_secs())
    }

    /// `Set-Cookie` value that removes the cookie.
    pub fn clear(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Raw credential as presented by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedCredential {
    Bearer(String),
    Session(SessionId),
}

/// Extract the caller's credential for the given mode.
pub fn extract_credential(
    headers: &HeaderMap,
    mode: AuthMode,
    cookie_name: &str,
) -> Result<PresentedCredential, AuthError> {
    match mode {
        AuthMode::Bearer => extract_bearer(headers).map(PresentedCredential::Bearer),
        AuthMode::CookieSession => {
            extract_session_id(headers, cookie_name).map(PresentedCredential::Session)
        }
    }
}

/// Parse `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively and the header must contain
/// exactly two whitespace-separated parts.
pub fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    let parts: Vec<&str> = auth_header.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok((*token).to_string()),
        _ => Err(AuthError::MalformedCredential),
    }
}

/// Find the session cookie and parse it as a session id.
pub fn extract_session_id(headers: &HeaderMap, cookie_name: &str) -> Result<SessionId, AuthError> {
    let value = find_cookie(headers, cookie_name).ok_or(AuthError::MissingCredential)?;
    SessionId::parse(&value).ok_or(AuthError::MalformedCredential)
}

/// Look up a cookie by name across every `Cookie` header.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}
