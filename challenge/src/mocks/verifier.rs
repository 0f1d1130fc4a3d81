//! Mock ID token verifier for testing.

use crate::error::{ChallengeError, Result};
use crate::verifier::{IdTokenClaims, IdTokenVerifier};
use std::sync::{Arc, Mutex};

/// Mock ID token verifier.
///
/// Accepts any token with fixed claims, or rejects every token.
#[derive(Debug, Clone)]
pub struct MockIdTokenVerifier {
    claims: Option<IdTokenClaims>,
    tokens: Arc<Mutex<Vec<String>>>,
}

impl MockIdTokenVerifier {
    /// Create a mock that verifies every token to `claims`.
    #[must_use]
    pub fn returning(claims: IdTokenClaims) -> Self {
        Self {
            claims: Some(claims),
            tokens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that rejects every token as badly signed.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            claims: None,
            tokens: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Tokens received, oldest first.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    /// Number of verifications attempted.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.tokens().len()
    }
}

impl IdTokenVerifier for MockIdTokenVerifier {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn verify(&self, id_token: &str) -> Result<IdTokenClaims> {
        self.tokens.lock().unwrap().push(id_token.to_string());
        self.claims
            .clone()
            .ok_or_else(|| ChallengeError::TokenInvalid("InvalidSignature".to_string()))
    }
}
