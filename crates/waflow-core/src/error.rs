// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Waflow delivery engine.

use thiserror::Error;

/// The primary error type used across the Waflow workspace.
#[derive(Debug, Error)]
pub enum WaflowError {
    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Webhook ingestion errors (malformed payload, unsupported event shape).
    #[error("webhook error: {message}")]
    Webhook { message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
