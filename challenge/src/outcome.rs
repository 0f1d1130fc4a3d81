//! Challenge outcomes and requester-visible statuses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status string reported to the requester on a rejected attempt.
///
/// Deliberately coarse: every authentication failure is reported as
/// [`ChallengeStatus::InvalidAccessCode`] regardless of its cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeStatus {
    /// A required parameter was absent or empty.
    InvalidParameters,

    /// The access code did not authenticate the requester.
    InvalidAccessCode,
}

impl ChallengeStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameters => "invalid-parameters",
            Self::InvalidAccessCode => "invalid-access-code",
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one challenge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The subject is authorized; the issuance layer may proceed.
    Success,

    /// The attempt was rejected and one retry was consumed.
    Retryable(ChallengeStatus),
}

impl ChallengeOutcome {
    /// Returns `true` for [`ChallengeOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns `true` if this outcome consumed a session retry.
    #[must_use]
    pub const fn decrements_retry(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Status to report, if the attempt was rejected.
    #[must_use]
    pub const fn status(&self) -> Option<ChallengeStatus> {
        match self {
            Self::Success => None,
            Self::Retryable(status) => Some(*status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(ChallengeStatus::InvalidParameters.as_str(), "invalid-parameters");
        assert_eq!(ChallengeStatus::InvalidAccessCode.to_string(), "invalid-access-code");

        let json = serde_json::to_string(&ChallengeStatus::InvalidAccessCode).unwrap();
        assert_eq!(json, "\"invalid-access-code\"");
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(ChallengeOutcome::Success.is_success());
        assert!(!ChallengeOutcome::Success.decrements_retry());
        assert_eq!(ChallengeOutcome::Success.status(), None);

        let rejected = ChallengeOutcome::Retryable(ChallengeStatus::InvalidParameters);
        assert!(!rejected.is_success());
        assert!(rejected.decrements_retry());
        assert_eq!(rejected.status(), Some(ChallengeStatus::InvalidParameters));
    }
}
