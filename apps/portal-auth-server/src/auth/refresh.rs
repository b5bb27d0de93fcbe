// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session credential resolution and refresh (cookie-session mode).
//!
//! ## States
//!
//! | Access credential | Refresh credential | Outcome |
//! |-------------------|--------------------|---------|
//! | valid | any | proceed |
//! | expired | present | one provider refresh; rotate or invalidate (`RefreshFailed`) |
//! | expired | absent | invalidate (`SessionInvalidated`) |
//! | malformed / bad signature | any | invalidate (`SessionInvalidated`) |
//!
//! The session slot stays locked from lookup to rotation, so a second request
//! on the same session waits and then sees the rotated pair instead of
//! spending the refresh credential again.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::claims::{CredentialKind, TokenPayload};
use super::codec::TokenCodec;
use super::error::AuthError;
use super::session::{SessionId, SessionRecord, SessionStore};
use crate::providers::IdentityProvider;

/// A session whose access credential is currently valid.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    /// Decoded (possibly freshly rotated) access credential
    pub payload: TokenPayload,
    /// Admin flag cached in the session record
    pub is_admin_cached: bool,
    /// Whether this request rotated the credentials
    pub refreshed: bool,
}

pub struct RefreshOrchestrator {
    codec: Arc<TokenCodec>,
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<SessionStore>,
}

impl RefreshOrchestrator {
    pub fn new(
        codec: Arc<TokenCodec>,
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            codec,
            provider,
            sessions,
        }
    }

    /// Resolve a session to a valid access credential, refreshing at most once.
    pub async fn resolve(&self, id: &SessionId) -> Result<ResolvedSession, AuthError> {
        let slot = self
            .sessions
            .checkout(id)
            .ok_or(AuthError::SessionInvalidated)?;
        let mut guard = slot.lock().await;
        let record = guard.clone().ok_or(AuthError::SessionInvalidated)?;

        match self.decode_access(&record, &record.access_credential) {
            Ok(payload) => Ok(ResolvedSession {
                payload,
                is_admin_cached: record.is_admin_cached,
                refreshed: false,
            }),
            Err(AuthError::ExpiredCredential) => match record.refresh_credential.clone() {
                Some(refresh_credential) => {
                    self.rotate(id, &mut guard, record, &refresh_credential).await
                }
                None => {
                    self.discard(id, &mut guard, "access credential expired without refresh credential");
                    Err(AuthError::SessionInvalidated)
                }
            },
            Err(AuthError::InternalFault(detail)) => Err(AuthError::InternalFault(detail)),
            Err(e) => {
                self.discard(id, &mut guard, e.error_code());
                Err(AuthError::SessionInvalidated)
            }
        }
    }

    async fn rotate(
        &self,
        id: &SessionId,
        slot: &mut Option<SessionRecord>,
        record: SessionRecord,
        refresh_credential: &str,
    ) -> Result<ResolvedSession, AuthError> {
        let tokens = match self.provider.refresh(refresh_credential).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(session_id = %id, subject_id = %record.subject_id, error = %e, "Session refresh failed");
                self.discard(id, slot, "refresh failed");
                return Err(AuthError::RefreshFailed);
            }
        };

        let payload = match self.decode_access(&record, &tokens.access_token) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    session_id = %id,
                    subject_id = %record.subject_id,
                    error_code = e.error_code(),
                    "Refreshed access credential rejected"
                );
                self.discard(id, slot, "refreshed credential rejected");
                return Err(AuthError::RefreshFailed);
            }
        };

        let refresh_credential = Some(tokens.refresh_token)
            .filter(|token| !token.is_empty())
            .or(record.refresh_credential.clone());
        let rotated = SessionRecord {
            access_credential: tokens.access_token,
            refresh_credential,
            ..record
        };
        let is_admin_cached = rotated.is_admin_cached;
        *slot = Some(rotated);

        info!(session_id = %id, subject_id = %payload.subject_id, "Session credentials rotated");
        Ok(ResolvedSession {
            payload,
            is_admin_cached,
            refreshed: true,
        })
    }

    /// Decode an access credential and check it belongs to the session's subject.
    fn decode_access(&self, record: &SessionRecord, token: &str) -> Result<TokenPayload, AuthError> {
        let payload = self.codec.decode_kind(token, CredentialKind::Access)?;
        if payload.subject_id != record.subject_id {
            return Err(AuthError::MalformedCredential);
        }
        Ok(payload)
    }

    fn discard(&self, id: &SessionId, slot: &mut Option<SessionRecord>, reason: &str) {
        *slot = None;
        self.sessions.remove(id);
        debug!(session_id = %id, reason, "Session invalidated");
    }
}
