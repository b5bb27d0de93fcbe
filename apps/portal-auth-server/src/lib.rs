// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal Auth Server - authentication gate for the e-learning portal
//!
//! Validates callers on every request, refreshes expired provider credentials
//! for cookie sessions, and reconciles the cached admin flag against the
//! authoritative `admins` table, failing closed when that table is out of reach.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential extraction, token codec, sessions, refresh, reconciliation
//! - `providers` - Identity provider and admin store collaborators (Supabase)
//! - `config` - Environment configuration
//! - `sweeper` - Idle session cleanup task

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod state;
pub mod sweeper;
