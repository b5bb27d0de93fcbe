// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process fakes for the external collaborators (tests only).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::claims::{CredentialKind, IdentityClaims, TokenPayload};
use super::codec::TokenCodec;
use super::roles::Role;
use crate::providers::{
    AdminStore, AdminStoreError, IdentityProvider, ProviderError, ProviderSession, ProviderTokens,
};

pub const TEST_SECRET: &str = "test-signing-secret-with-enough-entropy";

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET).unwrap()
}

/// Access token for `subject_id` that expired a minute ago.
pub fn expired_access_token(codec: &TokenCodec, subject_id: &str, email: &str) -> String {
    let now = Utc::now().timestamp();
    codec
        .encode_payload(&TokenPayload {
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            is_admin: false,
            role: "user".to_string(),
            issued_at: now - 1860,
            expires_at: now - 60,
            kind: CredentialKind::Access,
        })
        .unwrap()
}

/// Valid provider-style access token (no admin claim).
pub fn access_token(codec: &TokenCodec, subject_id: &str, email: &str, is_admin: bool) -> String {
    codec
        .encode(
            &IdentityClaims {
                subject_id: subject_id.to_string(),
                email: email.to_string(),
                is_admin,
                role: Role::User,
            },
            CredentialKind::Access,
        )
        .unwrap()
}

struct Account {
    password: String,
    subject_id: String,
}

/// Identity provider issuing tokens signed with the shared test secret.
pub struct FakeIdentityProvider {
    codec: TokenCodec,
    accounts: Mutex<HashMap<String, Account>>,
    refresh_tokens: Mutex<HashMap<String, (String, String)>>,
    fail_refresh: AtomicBool,
    refresh_calls: AtomicUsize,
}

impl FakeIdentityProvider {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            accounts: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            fail_refresh: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_account(self, email: &str, password: &str, subject_id: &str) -> Self {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                subject_id: subject_id.to_string(),
            },
        );
        self
    }

    /// Register a refresh token the provider will honour.
    pub fn issue_refresh_token(&self, subject_id: &str, email: &str) -> String {
        let token = format!("refresh-{}", Uuid::new_v4().simple());
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(token.clone(), (subject_id.to_string(), email.to_string()));
        token
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn tokens_for(&self, subject_id: &str, email: &str) -> ProviderTokens {
        ProviderTokens {
            access_token: access_token(&self.codec, subject_id, email, false),
            refresh_token: self.issue_refresh_token(subject_id, email),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError> {
        let subject_id = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => account.subject_id.clone(),
                _ => return Err(ProviderError::InvalidCredentials),
            }
        };

        Ok(ProviderSession {
            tokens: self.tokens_for(&subject_id, email),
            subject_id,
            email: email.to_string(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, ProviderError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("refresh endpoint down".to_string()));
        }

        // Refresh tokens are single use, as with the hosted provider.
        let owner = self.refresh_tokens.lock().unwrap().remove(refresh_token);
        let (subject_id, email) = owner.ok_or(ProviderError::InvalidCredentials)?;
        Ok(self.tokens_for(&subject_id, &email))
    }
}

/// Admin store backed by a set of subject ids.
#[derive(Default)]
pub struct FakeAdminStore {
    admins: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl FakeAdminStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(self, subject_id: &str) -> Self {
        self.admins.lock().unwrap().insert(subject_id.to_string());
        self
    }

    pub fn remove_admin(&self, subject_id: &str) {
        self.admins.lock().unwrap().remove(subject_id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdminStore for FakeAdminStore {
    async fn exists(&self, subject_id: &str) -> Result<bool, AdminStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AdminStoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self.admins.lock().unwrap().contains(subject_id))
    }
}
