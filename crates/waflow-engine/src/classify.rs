// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider error classification.
//!
//! Maps heterogeneous provider error payloads onto the stable internal
//! taxonomy in [`ErrorKind`]. Classification is a pure function of
//! `(code, subcode, message)`: no I/O, no side effects, and it never
//! fails: anything unrecognized lands in the unknown fallback so the send
//! path always receives a usable classification.
//!
//! Resolution is an ordered rule table; the first matching rule wins.
//! The order is a correctness invariant, not cosmetic: policy-block codes
//! beat everything, subcode overrides beat the generic code-100 fallback,
//! and the message heuristic only fires when no subcode matched.

use waflow_core::codes;
use waflow_core::{ErrorKind, FailureClassification, ProviderError};

/// Suggested wait after an account-level rate limit, in milliseconds.
pub const RATE_LIMIT_WAIT_MS: u64 = 3_600_000;
/// Suggested wait after a per-recipient-pair throttle, in milliseconds.
/// Deliberately much shorter than the account-level wait: the throttle is
/// scoped to one conversation, not the whole account.
pub const PAIR_RATE_LIMIT_WAIT_MS: u64 = 60_000;
/// Suggested wait before re-attempting after a credential refresh.
pub const AUTH_RETRY_WAIT_MS: u64 = 300_000;

/// Inputs to one classification decision.
#[derive(Debug, Clone, Copy)]
struct ErrorContext<'a> {
    code: i64,
    subcode: Option<i64>,
    message: &'a str,
}

/// One entry in the ordered classification table: a predicate plus the
/// classification it produces when it fires.
struct MatchRule {
    matches: fn(&ErrorContext<'_>) -> bool,
    classify: fn(&ErrorContext<'_>) -> FailureClassification,
}

fn base(ctx: &ErrorContext<'_>, kind: ErrorKind) -> FailureClassification {
    FailureClassification {
        kind,
        retryable: false,
        retry_delay_ms: None,
        user_message: String::new(),
        requires_user_action: false,
        raw_code: ctx.code,
        raw_subcode: ctx.subcode,
    }
}

/// Policy-block family: spam/policy violations, account locks, marketing
/// caps. Always non-retryable and always operator-facing, independent of
/// any subcode the provider attaches.
const POLICY_BLOCK_CODES: &[i64] = &[
    codes::POLICY_BLOCKED,
    codes::ACCOUNT_LOCKED,
    codes::MARKETING_LIMIT,
];

/// The ordered rule table. First match wins.
static RULES: &[MatchRule] = &[
    // 1. Policy-block codes beat everything, including subcodes.
    MatchRule {
        matches: |ctx| POLICY_BLOCK_CODES.contains(&ctx.code),
        classify: |ctx| FailureClassification {
            user_message: "Sending is blocked for policy reasons. Review your \
                           account health in WhatsApp Manager before sending again."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::PolicyBlocked)
        },
    },
    // 2. Subcode overrides under the generic invalid-parameter code.
    MatchRule {
        matches: |ctx| {
            ctx.code == codes::INVALID_PARAMETER
                && ctx.subcode == Some(codes::SUB_DUPLICATE_NAME)
        },
        classify: |ctx| FailureClassification {
            user_message: "A template with this name already exists. Pick a \
                           different name or edit the existing template."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::DuplicateResource)
        },
    },
    MatchRule {
        matches: |ctx| {
            ctx.code == codes::INVALID_PARAMETER
                && ctx.subcode == Some(codes::SUB_DUPLICATE_CONTENT)
        },
        classify: |ctx| FailureClassification {
            user_message: "This template's content duplicates an existing \
                           template. Change the content or reuse the original."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::DuplicateResource)
        },
    },
    MatchRule {
        matches: |ctx| {
            ctx.code == codes::INVALID_PARAMETER
                && ctx.subcode == Some(codes::SUB_BOUNDARY_VARIABLE)
        },
        classify: |ctx| FailureClassification {
            user_message: "Template body text cannot start or end with a \
                           variable. Add static text around the placeholder."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::ValidationError)
        },
    },
    MatchRule {
        matches: |ctx| {
            ctx.code == codes::INVALID_PARAMETER
                && ctx.subcode == Some(codes::SUB_EXAMPLE_VALIDATION)
        },
        classify: |ctx| FailureClassification {
            user_message: "The template's example values failed validation. \
                           Provide examples matching every variable."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::ValidationError)
        },
    },
    // 3. Message heuristic, only reached when no subcode rule matched.
    MatchRule {
        matches: |ctx| ctx.message.contains("does not exist"),
        classify: |ctx| FailureClassification {
            user_message: "A referenced resource does not exist upstream. \
                           Check the phone number ID and template configuration."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::ConfigurationError)
        },
    },
    // 4. Known top-level codes.
    MatchRule {
        matches: |ctx| ctx.code == codes::AUTH_EXPIRED,
        classify: |ctx| FailureClassification {
            user_message: "The access token has expired. Reconnect the \
                           WhatsApp account to refresh credentials."
                .to_string(),
            requires_user_action: true,
            retry_delay_ms: Some(AUTH_RETRY_WAIT_MS),
            ..base(ctx, ErrorKind::AuthExpired)
        },
    },
    MatchRule {
        matches: |ctx| {
            matches!(
                ctx.code,
                codes::RATE_LIMIT | codes::RATE_LIMIT_BUSINESS | codes::RATE_LIMIT_CLOUD
            )
        },
        classify: |ctx| FailureClassification {
            retryable: true,
            retry_delay_ms: Some(RATE_LIMIT_WAIT_MS),
            user_message: "Account message limit reached. Sending will resume \
                           automatically after the limit window passes."
                .to_string(),
            ..base(ctx, ErrorKind::RateLimited)
        },
    },
    MatchRule {
        matches: |ctx| ctx.code == codes::PAIR_RATE_LIMIT,
        classify: |ctx| FailureClassification {
            retryable: true,
            retry_delay_ms: Some(PAIR_RATE_LIMIT_WAIT_MS),
            user_message: "Too many messages to this recipient in a short \
                           period. The send will be retried shortly."
                .to_string(),
            ..base(ctx, ErrorKind::PairRateLimited)
        },
    },
    MatchRule {
        matches: |ctx| {
            ctx.code == codes::PERMISSION_DENIED || (200..300).contains(&ctx.code)
        },
        classify: |ctx| FailureClassification {
            user_message: "The connected account lacks permission for this \
                           operation. Check the app's WhatsApp permissions."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::PermissionDenied)
        },
    },
    MatchRule {
        matches: |ctx| ctx.code == codes::UNDELIVERABLE,
        classify: |ctx| FailureClassification {
            user_message: "This number cannot receive WhatsApp messages. It \
                           will be excluded from future sends."
                .to_string(),
            ..base(ctx, ErrorKind::Unreachable)
        },
    },
    MatchRule {
        matches: |ctx| ctx.code == codes::PAYMENT_ISSUE,
        classify: |ctx| FailureClassification {
            user_message: "There is a problem with the payment method on the \
                           business account. Update billing to resume sending."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::ConfigurationError)
        },
    },
    MatchRule {
        matches: |ctx| ctx.code == codes::REENGAGEMENT_WINDOW,
        classify: |ctx| FailureClassification {
            user_message: "More than 24 hours have passed since this contact \
                           last replied. Use an approved template message."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::ValidationError)
        },
    },
    MatchRule {
        matches: |ctx| ctx.code == codes::INVALID_PARAMETER,
        classify: |ctx| FailureClassification {
            user_message: "The provider rejected a request parameter. Check \
                           the message payload and template variables."
                .to_string(),
            requires_user_action: true,
            ..base(ctx, ErrorKind::ValidationError)
        },
    },
];

/// Classify one provider error.
///
/// Walks the ordered rule table; the first matching rule wins. Unknown
/// codes fall through to a conservative non-retryable classification that
/// prefers the provider's own `error_user_msg` when one was supplied.
pub fn classify(
    code: i64,
    subcode: Option<i64>,
    message: &str,
    error_user_msg: Option<&str>,
) -> FailureClassification {
    let ctx = ErrorContext {
        code,
        subcode,
        message,
    };

    for rule in RULES {
        if (rule.matches)(&ctx) {
            return (rule.classify)(&ctx);
        }
    }

    // Unknown fallback: never blindly retry an error we cannot name.
    let user_message = match error_user_msg {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => format!("Provider error ({code}): {message}"),
    };
    FailureClassification {
        user_message,
        ..base(&ctx, ErrorKind::Unknown)
    }
}

/// Classify straight from a deserialized provider error envelope.
///
/// A missing `code` classifies through the unknown fallback.
pub fn classify_payload(err: &ProviderError) -> FailureClassification {
    classify(
        err.code.unwrap_or(0),
        err.error_subcode,
        &err.message,
        err.error_user_msg.as_deref(),
    )
}

/// Whether the dispatch loop may retry a send that produced this
/// classification.
pub fn is_retryable(classification: &FailureClassification) -> bool {
    classification.retryable
}

/// Suggested wait before the next attempt, when the classification carries
/// a backoff hint. Rate limits and auth expiry carry hints; everything else
/// defaults to none.
pub fn retry_delay_ms(classification: &FailureClassification) -> Option<u64> {
    classification.retry_delay_ms
}

/// Narrow predicate for the per-recipient-pair throttle, distinct from the
/// account-level rate limit.
pub fn is_pair_rate_limit_error(code: i64) -> bool {
    code == codes::PAIR_RATE_LIMIT
}

/// Whether the failure needs operator intervention (surfaced in the
/// account-health summary).
pub fn requires_user_action(classification: &FailureClassification) -> bool {
    classification.requires_user_action
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_block_wins_over_subcode() {
        // Code 368 with a duplicate-name subcode still classifies as a
        // policy block; the subcode rules only apply under code 100.
        let c = classify(368, Some(codes::SUB_DUPLICATE_NAME), "blocked", None);
        assert_eq!(c.kind, ErrorKind::PolicyBlocked);
        assert!(!c.retryable);
        assert!(c.requires_user_action);
        assert!(c.user_message.contains("account health"));
    }

    #[test]
    fn subcode_beats_generic_code_100() {
        let dup = classify(100, Some(codes::SUB_DUPLICATE_NAME), "invalid", None);
        assert_eq!(dup.kind, ErrorKind::DuplicateResource);
        assert!(dup.user_message.contains("name already exists"));

        let generic = classify(100, None, "invalid parameter", None);
        assert_eq!(generic.kind, ErrorKind::ValidationError);
        assert_ne!(dup.user_message, generic.user_message);
    }

    #[test]
    fn duplicate_content_subcode() {
        let c = classify(100, Some(codes::SUB_DUPLICATE_CONTENT), "invalid", None);
        assert_eq!(c.kind, ErrorKind::DuplicateResource);
        assert!(c.user_message.contains("duplicates"));
    }

    #[test]
    fn boundary_and_example_subcodes_are_validation_errors() {
        let boundary = classify(100, Some(codes::SUB_BOUNDARY_VARIABLE), "invalid", None);
        assert_eq!(boundary.kind, ErrorKind::ValidationError);

        let example = classify(100, Some(codes::SUB_EXAMPLE_VALIDATION), "invalid", None);
        assert_eq!(example.kind, ErrorKind::ValidationError);
    }

    #[test]
    fn message_heuristic_maps_to_configuration_error() {
        let c = classify(
            33,
            None,
            "Object with ID '123' does not exist, cannot be loaded",
            None,
        );
        assert_eq!(c.kind, ErrorKind::ConfigurationError);
        assert!(c.requires_user_action);
    }

    #[test]
    fn rate_limit_codes_are_retryable_with_backoff() {
        for code in [4, 80007, 130429] {
            let c = classify(code, None, "limit reached", None);
            assert_eq!(c.kind, ErrorKind::RateLimited, "code {code}");
            assert!(c.retryable);
            assert_eq!(c.retry_delay_ms, Some(RATE_LIMIT_WAIT_MS));
        }
    }

    #[test]
    fn pair_rate_limit_is_distinct_and_shorter() {
        let c = classify(131056, None, "pair rate limit hit", None);
        assert_eq!(c.kind, ErrorKind::PairRateLimited);
        assert!(c.retryable);
        assert_eq!(c.retry_delay_ms, Some(PAIR_RATE_LIMIT_WAIT_MS));
        assert!(PAIR_RATE_LIMIT_WAIT_MS < RATE_LIMIT_WAIT_MS);

        assert!(is_pair_rate_limit_error(131056));
        assert!(!is_pair_rate_limit_error(4));
        assert!(!is_pair_rate_limit_error(130429));
    }

    #[test]
    fn auth_expired_needs_user_action() {
        let c = classify(190, None, "Error validating access token", None);
        assert_eq!(c.kind, ErrorKind::AuthExpired);
        assert!(!c.retryable);
        assert!(c.requires_user_action);
        assert!(c.retry_delay_ms.is_some());
    }

    #[test]
    fn permission_denied_code_range() {
        let c = classify(10, None, "permission denied", None);
        assert_eq!(c.kind, ErrorKind::PermissionDenied);

        let c = classify(230, None, "requires whatsapp_business_messaging", None);
        assert_eq!(c.kind, ErrorKind::PermissionDenied);
        assert!(!c.retryable);
    }

    #[test]
    fn undeliverable_is_not_retryable() {
        let c = classify(131026, None, "Message undeliverable", None);
        assert_eq!(c.kind, ErrorKind::Unreachable);
        assert!(!c.retryable);
        assert!(!c.requires_user_action);
    }

    #[test]
    fn unknown_code_prefers_provider_user_message() {
        let c = classify(
            999_999,
            None,
            "Something odd",
            Some("Please try again later."),
        );
        assert_eq!(c.kind, ErrorKind::Unknown);
        assert!(!c.retryable);
        assert_eq!(c.user_message, "Please try again later.");
    }

    #[test]
    fn unknown_code_synthesizes_message() {
        let c = classify(999_999, None, "Something odd", None);
        assert_eq!(c.user_message, "Provider error (999999): Something odd");
        assert_eq!(c.raw_code, 999_999);
    }

    #[test]
    fn classify_payload_handles_missing_code() {
        let err = ProviderError {
            message: "garbled".to_string(),
            ..Default::default()
        };
        let c = classify_payload(&err);
        assert_eq!(c.kind, ErrorKind::Unknown);
        assert!(!c.retryable);
    }

    #[test]
    fn predicates_mirror_classification_fields() {
        let limited = classify(4, None, "limit", None);
        assert!(is_retryable(&limited));
        assert_eq!(retry_delay_ms(&limited), Some(RATE_LIMIT_WAIT_MS));
        assert!(!requires_user_action(&limited));

        let blocked = classify(368, None, "blocked", None);
        assert!(!is_retryable(&blocked));
        assert!(requires_user_action(&blocked));
    }
}
