//! Error types for the OIDC challenge.
//!
//! These errors never reach the requester. The controller logs them and
//! collapses them into a [`ChallengeStatus`] via [`ChallengeError::status`].

use crate::outcome::ChallengeStatus;
use crate::policy::AssignmentRejected;
use thiserror::Error;

/// Result type alias for challenge operations.
pub type Result<T> = std::result::Result<T, ChallengeError>;

/// Internal failure taxonomy of the challenge pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    // ═══════════════════════════════════════════════════════════
    // Request Errors
    // ═══════════════════════════════════════════════════════════

    /// A required challenge parameter was absent or empty.
    #[error("Missing challenge parameter: {0}")]
    MissingParameter(&'static str),

    /// The access code is not valid UTF-8.
    #[error("Access code is not valid UTF-8")]
    MalformedAccessCode,

    // ═══════════════════════════════════════════════════════════
    // Identity Provider Errors
    // ═══════════════════════════════════════════════════════════

    /// Token endpoint unreachable or answered unexpectedly.
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    /// Token endpoint reported an OAuth error (e.g. `invalid_grant`).
    #[error("Identity provider rejected the code: {error}")]
    ProviderRejected {
        /// OAuth error code
        error: String,
        /// Optional human-readable description
        description: Option<String>,
    },

    /// Exchange succeeded but no ID token was returned.
    #[error("Token response carries no ID token")]
    MissingIdToken,

    // ═══════════════════════════════════════════════════════════
    // Token Verification Errors
    // ═══════════════════════════════════════════════════════════

    /// ID token malformed, badly signed, expired, or for another party.
    #[error("Invalid ID token: {0}")]
    TokenInvalid(String),

    /// Public key set could not be fetched or contained no usable key.
    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// Verified token lacks the configured identity claim.
    #[error("Identity claim '{0}' missing from ID token")]
    MissingIdentityClaim(String),

    // ═══════════════════════════════════════════════════════════
    // Policy Errors
    // ═══════════════════════════════════════════════════════════

    /// Assignment policy refused to bind the identity to the subject.
    #[error("Assignment policy rejected the identity")]
    AssignmentRejected,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Configuration is incomplete or malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A single-round challenge was asked for another round.
    #[error("Unexpected challenge round")]
    UnexpectedRound,

    /// Internal error (should not be exposed to requesters).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChallengeError {
    /// Status reported to the requester for this failure.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ndncert_oidc::{ChallengeError, ChallengeStatus};
    /// assert_eq!(
    ///     ChallengeError::MissingParameter("oidc-id").status(),
    ///     ChallengeStatus::InvalidParameters,
    /// );
    /// assert_eq!(
    ///     ChallengeError::AssignmentRejected.status(),
    ///     ChallengeStatus::InvalidAccessCode,
    /// );
    /// ```
    #[must_use]
    pub const fn status(&self) -> ChallengeStatus {
        match self {
            Self::MissingParameter(_) => ChallengeStatus::InvalidParameters,
            _ => ChallengeStatus::InvalidAccessCode,
        }
    }

    /// Returns `true` if the failure came from the identity provider or the
    /// network rather than from the requester's input or local policy.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::ExchangeFailed(_) | Self::KeySetUnavailable(_)
        )
    }
}

impl From<AssignmentRejected> for ChallengeError {
    fn from(_: AssignmentRejected) -> Self {
        Self::AssignmentRejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_parameter_is_invalid_parameters() {
        let errors = [
            ChallengeError::MalformedAccessCode,
            ChallengeError::ExchangeFailed("timeout".to_string()),
            ChallengeError::ProviderRejected {
                error: "invalid_grant".to_string(),
                description: None,
            },
            ChallengeError::MissingIdToken,
            ChallengeError::TokenInvalid("bad signature".to_string()),
            ChallengeError::KeySetUnavailable("404".to_string()),
            ChallengeError::MissingIdentityClaim("email".to_string()),
            ChallengeError::AssignmentRejected,
            ChallengeError::Internal("boom".to_string()),
        ];
        for error in errors {
            assert_eq!(error.status(), ChallengeStatus::InvalidAccessCode, "{error}");
        }
        assert_eq!(
            ChallengeError::MissingParameter("access-code").status(),
            ChallengeStatus::InvalidParameters
        );
    }

    #[test]
    fn test_upstream_classification() {
        assert!(ChallengeError::ExchangeFailed("dns".to_string()).is_upstream());
        assert!(!ChallengeError::AssignmentRejected.is_upstream());
    }

    #[test]
    fn test_from_assignment_rejected() {
        let error: ChallengeError = AssignmentRejected.into();
        assert_eq!(error, ChallengeError::AssignmentRejected);
    }
}
