// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure decision layer of the Waflow delivery engine.
//!
//! Two concerns live here, both consumed synchronously on the hot send path:
//!
//! - [`classify`]: maps provider error payloads onto the internal taxonomy
//!   and answers retry/backoff/user-action questions about a failure.
//! - [`suppress`]: decides whether a destination should be blocked from
//!   further sends, for how long, and whether an existing suppression
//!   record currently applies.
//!
//! Everything here is a pure function; storage round-trips and retry
//! orchestration belong to the callers.

pub mod classify;
pub mod suppress;

pub use classify::{
    classify, classify_payload, is_pair_rate_limit_error, is_retryable, requires_user_action,
    retry_delay_ms,
};
pub use suppress::{
    compute_ttl_days, expiry_from_ttl, is_active, is_active_now, should_auto_suppress,
};
