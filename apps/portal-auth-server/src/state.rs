// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::{Duration, Instant};

use crate::auth::{AuthGate, AuthMode, CookieSettings};

#[derive(Clone)]
pub struct AppState {
    pub gate: AuthGate,
    started_at: Instant,
}

impl AppState {
    pub fn new(gate: AuthGate) -> Self {
        Self {
            gate,
            started_at: Instant::now(),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.gate.mode()
    }

    pub fn cookie(&self) -> &CookieSettings {
        self.gate.cookie()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
