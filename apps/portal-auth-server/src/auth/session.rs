// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-held sessions for cookie-session mode.
//!
//! Each session lives in its own slot guarded by an async mutex. Credential
//! rotation and privilege reconciliation replace the whole record while
//! holding that mutex, so concurrent requests on one session never see an
//! old access credential paired with a new refresh credential.
//!
//! The index itself is a bounded LRU with an idle timeout, enforced lazily on
//! access and periodically by the session sweeper.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use uuid::Uuid;

/// Default idle lifetime of a session (1 hour).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default maximum number of live sessions.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Opaque session identifier (UUID v4, simple hex form).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a presented session id; anything that is not a UUID is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::try_parse(value.trim())
            .ok()
            .map(|uuid| Self(uuid.simple().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub subject_id: String,
    pub is_admin_cached: bool,
    pub access_credential: String,
    pub refresh_credential: Option<String>,
    pub last_reconciled_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(
        subject_id: impl Into<String>,
        is_admin_cached: bool,
        access_credential: impl Into<String>,
        refresh_credential: Option<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            is_admin_cached,
            access_credential: access_credential.into(),
            refresh_credential: refresh_credential.filter(|token| !token.is_empty()),
            last_reconciled_at: None,
        }
    }
}

/// A session's lock. `None` once the session has been invalidated.
pub type SessionSlot = Arc<tokio::sync::Mutex<Option<SessionRecord>>>;

struct SessionEntry {
    slot: SessionSlot,
    last_seen: Instant,
}

/// Bounded in-process session store.
pub struct SessionStore {
    sessions: Mutex<LruCache<SessionId, SessionEntry>>,
    idle_timeout: Duration,
}

impl SessionStore {
    /// Create a store holding at most `capacity` sessions.
    pub fn new(capacity: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Store a new session and return its id.
    pub fn create(&self, record: SessionRecord) -> SessionId {
        let id = SessionId::generate();
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.put(
                id.clone(),
                SessionEntry {
                    slot: Arc::new(tokio::sync::Mutex::new(Some(record))),
                    last_seen: Instant::now(),
                },
            );
        }
        id
    }

    /// Get the slot for a live session and mark it as used.
    ///
    /// Returns `None` for unknown sessions and drops idle ones.
    pub fn checkout(&self, id: &SessionId) -> Option<SessionSlot> {
        let mut sessions = self.sessions.lock().ok()?;
        let idle = match sessions.get_mut(id) {
            Some(entry) if entry.last_seen.elapsed() < self.idle_timeout => {
                entry.last_seen = Instant::now();
                return Some(entry.slot.clone());
            }
            Some(_) => true,
            None => false,
        };
        if idle {
            sessions.pop(id);
        }
        None
    }

    /// Remove a session from the index.
    ///
    /// Callers already holding the slot lock must also clear the slot.
    pub fn remove(&self, id: &SessionId) -> bool {
        self.sessions
            .lock()
            .map(|mut sessions| sessions.pop(id).is_some())
            .unwrap_or(false)
    }

    /// Destroy a session; in-flight requests holding its slot see `None`.
    pub async fn invalidate(&self, id: &SessionId) -> bool {
        let slot = self
            .sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.pop(id))
            .map(|entry| entry.slot);

        match slot {
            Some(slot) => slot.lock().await.take().is_some(),
            None => false,
        }
    }

    /// Snapshot of a live session record.
    pub async fn get(&self, id: &SessionId) -> Option<SessionRecord> {
        let slot = self.checkout(id)?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Apply `f` to a copy of the record and store the copy whole.
    ///
    /// Returns `false` if the session no longer exists.
    pub async fn update<F>(&self, id: &SessionId, f: F) -> bool
    where
        F: FnOnce(&mut SessionRecord),
    {
        let Some(slot) = self.checkout(id) else {
            return false;
        };
        let mut guard = slot.lock().await;
        match guard.as_ref() {
            Some(current) => {
                let mut next = current.clone();
                f(&mut next);
                *guard = Some(next);
                true
            }
            None => false,
        }
    }

    /// Drop every session idle for longer than the timeout.
    pub fn purge_idle(&self) -> usize {
        let Ok(mut sessions) = self.sessions.lock() else {
            return 0;
        };
        let idle: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, entry)| entry.last_seen.elapsed() >= self.idle_timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &idle {
            sessions.pop(id);
        }
        idle.len()
    }

    /// Number of sessions currently indexed.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_IDLE_TIMEOUT)
    }
}
