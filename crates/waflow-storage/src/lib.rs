// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Waflow delivery engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, typed operations
//! for suppression records, run metrics, and per-recipient delivery
//! events, and the run/trace reconciler.
//!
//! The single-writer model is what makes the status-transition guards in
//! [`queries::events`] safe: the racing send-path and webhook-path writes
//! are serialized on one background thread, and each guard is a single
//! conditional UPDATE.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod reconcile;

pub use database::Database;
pub use models::*;
pub use reconcile::list_runs;
