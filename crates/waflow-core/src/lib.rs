// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Waflow delivery-reliability engine.
//!
//! Provides the shared error enum, provider error-code constants, and the
//! common types used throughout the workspace: classification results,
//! suppression records and policy config, run/event records, and the
//! reconciled delivery-run view.

pub mod codes;
pub mod error;
pub mod payload;
pub mod types;

pub use error::WaflowError;
pub use payload::ProviderError;
pub use types::{
    AutoSuppressionConfig, CodePolicy, DeliveryRun, DeliveryStatus, ErrorKind,
    FailureClassification, RecipientEvent, RunMetricsRecord, RunSource, SuppressionRecord,
};
