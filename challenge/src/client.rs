//! Requester side of the OIDC challenge.
//!
//! The requester obtains an authorization code from the identity provider out
//! of band and submits it in a single round.

use crate::constants::parameters;
use crate::error::{ChallengeError, Result};
use crate::request::{ChallengeRequest, ParameterKV};
use std::fmt;

/// Builds the parameters a requester submits.
#[derive(Clone)]
pub struct ClientOidcChallenge {
    challenge_id: String,
    oidc_id: String,
    access_code: String,
}

impl ClientOidcChallenge {
    /// Create a client for challenge `challenge_id`.
    #[must_use]
    pub fn new(
        challenge_id: impl Into<String>,
        oidc_id: impl Into<String>,
        access_code: impl Into<String>,
    ) -> Self {
        Self {
            challenge_id: challenge_id.into(),
            oidc_id: oidc_id.into(),
            access_code: access_code.into(),
        }
    }

    /// Challenge this client answers.
    #[must_use]
    pub fn challenge_id(&self) -> &str {
        &self.challenge_id
    }

    /// Parameters for the first (and only) round.
    #[must_use]
    pub fn start(&self) -> ParameterKV {
        ParameterKV::from([
            (parameters::OIDC_ID.to_string(), self.oidc_id.as_bytes().to_vec()),
            (
                parameters::ACCESS_CODE.to_string(),
                self.access_code.as_bytes().to_vec(),
            ),
        ])
    }

    /// First-round parameters as a request.
    #[must_use]
    pub fn request(&self) -> ChallengeRequest {
        ChallengeRequest::from_parameters(self.start())
    }

    /// Parameters for a follow-up round.
    ///
    /// # Errors
    ///
    /// Always returns [`ChallengeError::UnexpectedRound`]: the challenge
    /// completes in one round.
    pub fn next(&self, _status: &ParameterKV) -> Result<ParameterKV> {
        Err(ChallengeError::UnexpectedRound)
    }
}

impl fmt::Debug for ClientOidcChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOidcChallenge")
            .field("challenge_id", &self.challenge_id)
            .field("oidc_id", &self.oidc_id)
            .field("access_code", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_parameters() {
        let client = ClientOidcChallenge::new("google-oidc", "u1", "4/0AbCd");
        let params = client.start();
        assert_eq!(params.get("oidc-id").map(Vec::as_slice), Some(&b"u1"[..]));
        assert_eq!(params.get("access-code").map(Vec::as_slice), Some(&b"4/0AbCd"[..]));
        assert_eq!(client.challenge_id(), "google-oidc");

        let (oidc_id, code) = client.request().oidc_parameters().map(|(a, b)| (a.to_vec(), b.to_vec())).unwrap();
        assert_eq!(oidc_id, b"u1");
        assert_eq!(code, b"4/0AbCd");
    }

    #[test]
    fn test_single_round() {
        let client = ClientOidcChallenge::new("google-oidc", "u1", "code");
        assert_eq!(client.next(&ParameterKV::new()), Err(ChallengeError::UnexpectedRound));
    }

    #[test]
    fn test_debug_redacts_code() {
        let client = ClientOidcChallenge::new("google-oidc", "u1", "secret-code");
        assert!(!format!("{client:?}").contains("secret-code"));
    }
}
