// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider error code constants.
//!
//! Numeric codes from the WhatsApp Cloud API error surface. Kept in one
//! place so the classifier rule table and the suppression allow-list never
//! drift apart.

/// Temporarily blocked for policy violations.
pub const POLICY_BLOCKED: i64 = 368;
/// Account locked after repeated policy violations.
pub const ACCOUNT_LOCKED: i64 = 131031;
/// Marketing message limit reached for this account.
pub const MARKETING_LIMIT: i64 = 131049;

/// Generic invalid-parameter code; meaning refined by subcode.
pub const INVALID_PARAMETER: i64 = 100;
/// Subcode: message template name already exists.
pub const SUB_DUPLICATE_NAME: i64 = 2388023;
/// Subcode: message template content duplicates an existing template.
pub const SUB_DUPLICATE_CONTENT: i64 = 2388024;
/// Subcode: template variables at the start/end of body text.
pub const SUB_BOUNDARY_VARIABLE: i64 = 2388043;
/// Subcode: template example values failed validation.
pub const SUB_EXAMPLE_VALIDATION: i64 = 2388042;

/// Access token expired or invalidated.
pub const AUTH_EXPIRED: i64 = 190;
/// API-wide request ceiling.
pub const RATE_LIMIT: i64 = 4;
/// Business-account message throughput limit.
pub const RATE_LIMIT_BUSINESS: i64 = 80007;
/// Cloud API throughput limit.
pub const RATE_LIMIT_CLOUD: i64 = 130429;
/// Per sender/recipient pair throttle.
pub const PAIR_RATE_LIMIT: i64 = 131056;
/// Caller lacks permission for the operation.
pub const PERMISSION_DENIED: i64 = 10;

/// Recipient permanently unreachable (not a WhatsApp user, deleted account).
/// The only code that participates in auto-suppression.
pub const UNDELIVERABLE: i64 = 131026;
/// Payment method failure on the business account.
pub const PAYMENT_ISSUE: i64 = 131042;
/// Outside the 24-hour re-engagement window.
pub const REENGAGEMENT_WINDOW: i64 = 131047;
