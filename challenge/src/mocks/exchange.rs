//! Mock token exchanger for testing.

use crate::error::{ChallengeError, Result};
use crate::exchange::{TokenExchanger, TokenResponse};
use std::sync::{Arc, Mutex};

/// Mock token exchanger.
///
/// Returns a predefined response and records every code it receives.
#[derive(Debug, Clone)]
pub struct MockTokenExchanger {
    response: Option<TokenResponse>,
    codes: Arc<Mutex<Vec<String>>>,
}

impl MockTokenExchanger {
    /// Create a mock that answers every code with `response`.
    ///
    /// A response carrying an `error` field is reported as a provider
    /// rejection, like the HTTP exchanger does.
    #[must_use]
    pub fn returning(response: TokenResponse) -> Self {
        Self {
            response: Some(response),
            codes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock whose token endpoint is unreachable.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            response: None,
            codes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Codes received, oldest first.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }

    /// Number of exchanges attempted.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.codes().len()
    }
}

impl TokenExchanger for MockTokenExchanger {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.codes.lock().unwrap().push(code.to_string());

        let response = self
            .response
            .clone()
            .ok_or_else(|| ChallengeError::ExchangeFailed("connection refused".to_string()))?;

        match response.rejection() {
            Some(rejection) => Err(rejection),
            None => Ok(response),
        }
    }
}
