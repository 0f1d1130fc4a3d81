//! Authorization code exchange.
//!
//! Turns an authorization code into a token endpoint response. No retries
//! happen here; retries are a session-level concept.

use crate::config::ExchangeConfig;
use crate::error::{ChallengeError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Exchanges authorization codes at an identity provider.
///
/// # Implementation Notes
///
/// - A response carrying an OAuth `error` field must be reported as
///   [`ChallengeError::ProviderRejected`], whatever the HTTP status.
/// - Implementations must not retain the code after the call returns.
pub trait TokenExchanger: Send + Sync {
    /// Exchange `code` for tokens.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails
    /// - Provider rejects the code
    /// - Response is malformed
    fn exchange_code(&self, code: &str) -> impl Future<Output = Result<TokenResponse>> + Send;
}

/// Token endpoint response body.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    /// Access token for provider APIs.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Signed ID token (JWT), present with the `openid` scope.
    #[serde(default)]
    pub id_token: Option<String>,

    /// Token type (normally "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,

    /// OAuth error code (e.g. `invalid_grant`).
    #[serde(default)]
    pub error: Option<String>,

    /// Human-readable error description.
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// Response carrying only an ID token.
    #[must_use]
    pub fn with_id_token(id_token: impl Into<String>) -> Self {
        Self {
            id_token: Some(id_token.into()),
            ..Self::default()
        }
    }

    /// Response carrying a provider error.
    #[must_use]
    pub fn provider_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// The provider-reported error, if any.
    ///
    /// An `error` field that is present but empty still counts.
    #[must_use]
    pub fn rejection(&self) -> Option<ChallengeError> {
        self.error.as_ref().map(|error| ChallengeError::ProviderRejected {
            error: error.clone(),
            description: self.error_description.clone(),
        })
    }
}

// Tokens are bearer credentials; only their presence is printed.
impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("error", &self.error)
            .field("error_description", &self.error_description)
            .finish()
    }
}

/// Token exchanger speaking OAuth 2.0 over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTokenExchanger {
    http_client: Client,
    config: Arc<ExchangeConfig>,
}

impl HttpTokenExchanger {
    /// Create an exchanger with its own HTTP client.
    ///
    /// The client's timeout is [`ExchangeConfig::effective_timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::InvalidConfig`] if the HTTP client cannot
    /// be built.
    pub fn new(config: Arc<ExchangeConfig>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.effective_timeout())
            .build()
            .map_err(|e| ChallengeError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http_client, config))
    }

    /// Create an exchanger sharing an existing HTTP client.
    #[must_use]
    pub const fn with_client(http_client: Client, config: Arc<ExchangeConfig>) -> Self {
        Self {
            http_client,
            config,
        }
    }
}

impl TokenExchanger for HttpTokenExchanger {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let form = self.config.token_request_form(code);

        let mut request = self.http_client.post(&self.config.token_url).form(&form);
        for (name, value) in &self.config.request_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChallengeError::ExchangeFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChallengeError::ExchangeFailed(e.to_string()))?;

        let parsed = serde_json::from_str::<TokenResponse>(&body);

        // Providers answer a bad code with 400 and an `error` body; that is a
        // rejection, not a transport failure.
        if let Ok(token_response) = &parsed {
            if let Some(rejection) = token_response.rejection() {
                tracing::debug!(
                    status = status.as_u16(),
                    error = ?token_response.error,
                    "Token endpoint rejected authorization code"
                );
                return Err(rejection);
            }
        }

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                url = %self.config.token_url,
                "Token exchange failed"
            );
            return Err(ChallengeError::ExchangeFailed(format!(
                "Token endpoint returned status {status}"
            )));
        }

        parsed.map_err(|e| ChallengeError::ExchangeFailed(format!("Malformed token response: {e}")))
    }
}
