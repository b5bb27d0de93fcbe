// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reconciliation of the cached admin flag against the `admins` table.
//!
//! | Cached flag | Store answer | Decision | Cache |
//! |-------------|--------------|----------|-------|
//! | `true` | not asked | admin | unchanged |
//! | `false` | row exists | admin | promoted, `last_reconciled_at` stamped |
//! | `false` | no row | not admin | `last_reconciled_at` stamped |
//! | `false` | error | not admin (degraded) | untouched |
//!
//! The `true` row is the declared fast path: a session already trusted as
//! admin is not re-verified on every request. Store failures fail closed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::claims::AuthenticatedUser;
use super::error::AuthError;
use super::session::{SessionId, SessionStore};
use crate::providers::{AdminStore, AdminStoreError};

/// How admin status was established for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeSource {
    /// Cached flag was already `true`; no lookup made
    CachedFlag,
    /// The authoritative store confirmed an admin row
    AuthoritativeRecord,
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeDecision {
    Admin(PrivilegeSource),
    NotAdmin,
    /// Store unreachable; treated as not admin.
    Degraded,
}

impl PrivilegeDecision {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }

    /// Convert into the gate's result.
    pub fn into_result(self) -> Result<PrivilegeSource, AuthError> {
        match self {
            Self::Admin(source) => Ok(source),
            Self::NotAdmin => Err(AuthError::InsufficientPrivileges),
            Self::Degraded => Err(AuthError::PrivilegeCheckDegraded),
        }
    }
}

#[derive(Debug, Default)]
struct ReconcilerStats {
    fast_path: AtomicU64,
    lookups: AtomicU64,
    promotions: AtomicU64,
    degraded: AtomicU64,
    last_lookup_failed: AtomicBool,
}

/// Point-in-time copy of the reconciler counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconcilerSnapshot {
    /// Requests admitted on the cached flag alone
    pub fast_path: u64,
    /// Authoritative store lookups made
    pub lookups: u64,
    /// Lookups that found an admin row
    pub promotions: u64,
    /// Lookups that failed and were answered closed
    pub degraded: u64,
    /// Whether the most recent lookup failed
    pub last_lookup_failed: bool,
}

pub struct PrivilegeReconciler {
    admins: Arc<dyn AdminStore>,
    sessions: Arc<SessionStore>,
    stats: ReconcilerStats,
}

impl PrivilegeReconciler {
    pub fn new(admins: Arc<dyn AdminStore>, sessions: Arc<SessionStore>) -> Self {
        Self {
            admins,
            sessions,
            stats: ReconcilerStats::default(),
        }
    }

    /// Decide whether `user` is an admin for the current request.
    pub async fn reconcile(&self, user: &AuthenticatedUser) -> PrivilegeDecision {
        if user.is_admin {
            self.stats.fast_path.fetch_add(1, Ordering::Relaxed);
            debug!(subject_id = %user.subject_id, "Admin admitted on cached flag");
            return PrivilegeDecision::Admin(PrivilegeSource::CachedFlag);
        }

        match self.query(&user.subject_id).await {
            Ok(true) => {
                self.stats.promotions.fetch_add(1, Ordering::Relaxed);
                self.persist(user, true).await;
                info!(subject_id = %user.subject_id, "Admin status confirmed by admin store");
                PrivilegeDecision::Admin(PrivilegeSource::AuthoritativeRecord)
            }
            Ok(false) => {
                self.persist(user, false).await;
                debug!(subject_id = %user.subject_id, "No admin record for subject");
                PrivilegeDecision::NotAdmin
            }
            Err(e) => {
                warn!(
                    subject_id = %user.subject_id,
                    error = %e,
                    "Admin store unreachable; denying admin access"
                );
                PrivilegeDecision::Degraded
            }
        }
    }

    /// One-off lookup used at sign-in.
    ///
    /// `None` when the store is unreachable; callers treat that as not admin.
    pub async fn lookup(&self, subject_id: &str) -> Option<bool> {
        match self.query(subject_id).await {
            Ok(is_admin) => {
                if is_admin {
                    self.stats.promotions.fetch_add(1, Ordering::Relaxed);
                }
                Some(is_admin)
            }
            Err(e) => {
                warn!(subject_id, error = %e, "Admin store unreachable at sign-in; assuming not admin");
                None
            }
        }
    }

    pub fn snapshot(&self) -> ReconcilerSnapshot {
        ReconcilerSnapshot {
            fast_path: self.stats.fast_path.load(Ordering::Relaxed),
            lookups: self.stats.lookups.load(Ordering::Relaxed),
            promotions: self.stats.promotions.load(Ordering::Relaxed),
            degraded: self.stats.degraded.load(Ordering::Relaxed),
            last_lookup_failed: self.stats.last_lookup_failed.load(Ordering::Relaxed),
        }
    }

    /// Ask the admin store, keeping the lookup counters current.
    async fn query(&self, subject_id: &str) -> Result<bool, AdminStoreError> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        let result = self.admins.exists(subject_id).await;
        if result.is_err() {
            self.stats.degraded.fetch_add(1, Ordering::Relaxed);
        }
        self.stats
            .last_lookup_failed
            .store(result.is_err(), Ordering::Relaxed);
        result
    }

    /// Write a definitive answer back to the caller's session, if it has one.
    async fn persist(&self, user: &AuthenticatedUser, promoted: bool) {
        let Some(id) = user.session_id.as_deref().and_then(SessionId::parse) else {
            return;
        };
        let subject_id = user.subject_id.as_str();
        let updated = self
            .sessions
            .update(&id, |record| {
                if record.subject_id != subject_id {
                    return;
                }
                if promoted {
                    record.is_admin_cached = true;
                }
                record.last_reconciled_at = Some(Utc::now());
            })
            .await;
        if !updated {
            debug!(session_id = %id, "Session gone before reconciliation was stored");
        }
    }
}
