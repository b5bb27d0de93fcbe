// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Sweeper
//!
//! Background task that drops idle sessions. Idle sessions are already
//! rejected on access; the sweeper bounds memory held by sessions nobody
//! comes back to.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, stopped from `main` when the
//! server shuts down.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::SessionStore;

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct SessionSweeper {
    sessions: Arc<SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self {
            sessions,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Session sweeper starting");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }

            self.sweep();
        }
    }

    fn sweep(&self) -> usize {
        let purged = self.sessions.purge_idle();
        if purged > 0 {
            info!(purged, remaining = self.sessions.len(), "Idle sessions purged");
        } else {
            debug!(remaining = self.sessions.len(), "No idle sessions");
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionRecord;

    #[tokio::test]
    async fn sweeps_idle_sessions_until_cancelled() {
        let sessions = Arc::new(SessionStore::new(10, Duration::from_millis(1)));
        sessions.create(SessionRecord::new("user_1", false, "access", None));

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            SessionSweeper::new(sessions.clone())
                .with_interval(Duration::from_millis(5))
                .run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sessions.is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn sweep_reports_purged_count() {
        let sessions = Arc::new(SessionStore::new(10, Duration::from_millis(1)));
        sessions.create(SessionRecord::new("user_1", false, "access", None));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(SessionSweeper::new(sessions).sweep(), 1);
    }
}
