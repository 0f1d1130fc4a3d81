//! Challenge configuration.
//!
//! [`ExchangeConfig`] is built once at startup and shared read-only (behind an
//! `Arc`) by every concurrent session. Per-attempt data such as the
//! authorization code is never written into it; see
//! [`ExchangeConfig::token_request_form`].

use crate::constants::{
    google, CLOCK_SKEW_SECS, DEFAULT_IDENTITY_CLAIM, DEFAULT_JWKS_TTL_SECS, DEFAULT_RETRY_LIMIT,
    DEFAULT_TIME_LIMIT_SECS,
};
use crate::error::{ChallengeError, Result};
use std::fmt;
use std::time::Duration;

/// Token exchange and verification settings.
#[derive(Clone)]
pub struct ExchangeConfig {
    /// OAuth 2.0 token endpoint.
    pub token_url: String,

    /// Public key set (JWKS) endpoint of the identity provider.
    pub jwks_url: String,

    /// Redirect URI registered with the identity provider.
    pub redirect_uri: String,

    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret (never logged).
    pub client_secret: String,

    /// Requested scope.
    ///
    /// Default: `openid`
    pub scope: String,

    /// Grant type.
    ///
    /// Default: `authorization_code`
    pub grant_type: String,

    /// Extra headers sent with every token request.
    pub request_headers: Vec<(String, String)>,

    /// Challenge identifier advertised in the CA profile.
    pub challenge_id: String,

    /// Session time limit.
    ///
    /// Default: 60 seconds
    pub time_limit: Duration,

    /// Attempts allowed per session.
    ///
    /// Default: 1
    pub retry_limit: u32,

    /// ID token claim bound to the certificate subject.
    ///
    /// Default: `email`
    pub identity_claim: String,

    /// Expected `iss`; unchecked when `None`.
    pub expected_issuer: Option<String>,

    /// Expected `aud`; unchecked when `None`.
    pub expected_audience: Option<String>,

    /// Key set cache lifetime.
    ///
    /// Default: 1 hour
    pub jwks_ttl: Duration,

    /// Timeout for each outbound HTTP call; falls back to `time_limit`.
    pub request_timeout: Option<Duration>,

    /// Reject exchanges that return no ID token instead of accepting them.
    ///
    /// Default: false
    pub require_id_token: bool,

    /// Clock skew tolerated on `exp`/`nbf`.
    ///
    /// Default: 30 seconds
    pub clock_skew: Duration,
}

impl ExchangeConfig {
    /// Create a configuration for an arbitrary OIDC provider.
    ///
    /// # Arguments
    ///
    /// * `token_url` - OAuth 2.0 token endpoint
    /// * `jwks_url` - public key set endpoint
    /// * `client_id` - OAuth client id
    /// * `client_secret` - OAuth client secret
    /// * `redirect_uri` - redirect URI registered for the client
    #[must_use]
    pub fn new(
        token_url: impl Into<String>,
        jwks_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            jwks_url: jwks_url.into(),
            redirect_uri: redirect_uri.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: "openid".to_string(),
            grant_type: "authorization_code".to_string(),
            request_headers: Vec::new(),
            challenge_id: "oidc".to_string(),
            time_limit: Duration::from_secs(DEFAULT_TIME_LIMIT_SECS),
            retry_limit: DEFAULT_RETRY_LIMIT,
            identity_claim: DEFAULT_IDENTITY_CLAIM.to_string(),
            expected_issuer: None,
            expected_audience: None,
            jwks_ttl: Duration::from_secs(DEFAULT_JWKS_TTL_SECS),
            request_timeout: None,
            require_id_token: false,
            clock_skew: Duration::from_secs(CLOCK_SKEW_SECS),
        }
    }

    /// Google identity platform, challenge id `google-oidc`.
    #[must_use]
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self::new(
            google::TOKEN_URL,
            google::JWKS_URL,
            client_id,
            client_secret,
            redirect_uri,
        )
        .with_challenge_id(google::CHALLENGE_ID)
    }

    /// Build from environment variables.
    ///
    /// Required: `OIDC_CLIENT_ID`, `OIDC_CLIENT_SECRET`, `OIDC_REDIRECT_URI`.
    /// Optional: `OIDC_TOKEN_URL`, `OIDC_JWKS_URL` (Google when unset),
    /// `OIDC_CHALLENGE_ID`.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::InvalidConfig`] if a required variable is
    /// unset or the result fails [`ExchangeConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ChallengeError::InvalidConfig(format!("{name} is not set")))
        };

        let mut config = Self::google(
            required("OIDC_CLIENT_ID")?,
            required("OIDC_CLIENT_SECRET")?,
            required("OIDC_REDIRECT_URI")?,
        );
        if let Some(url) = lookup("OIDC_TOKEN_URL") {
            config.token_url = url;
        }
        if let Some(url) = lookup("OIDC_JWKS_URL") {
            config.jwks_url = url;
        }
        if let Some(id) = lookup("OIDC_CHALLENGE_ID") {
            config.challenge_id = id;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the challenge identifier.
    #[must_use]
    pub fn with_challenge_id(mut self, challenge_id: impl Into<String>) -> Self {
        self.challenge_id = challenge_id.into();
        self
    }

    /// Set the session time limit.
    #[must_use]
    pub const fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Set attempts allowed per session.
    #[must_use]
    pub const fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Set the requested scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Add a header sent with every token request.
    #[must_use]
    pub fn with_request_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.push((name.into(), value.into()));
        self
    }

    /// Set the claim bound to the certificate subject.
    #[must_use]
    pub fn with_identity_claim(mut self, claim: impl Into<String>) -> Self {
        self.identity_claim = claim.into();
        self
    }

    /// Require `iss` to equal `issuer`.
    #[must_use]
    pub fn with_expected_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.expected_issuer = Some(issuer.into());
        self
    }

    /// Require `aud` to contain `audience`.
    #[must_use]
    pub fn with_expected_audience(mut self, audience: impl Into<String>) -> Self {
        self.expected_audience = Some(audience.into());
        self
    }

    /// Set the key set cache lifetime.
    #[must_use]
    pub const fn with_jwks_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_ttl = ttl;
        self
    }

    /// Bound each outbound HTTP call.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Reject exchanges that return no ID token.
    #[must_use]
    pub const fn with_require_id_token(mut self, require: bool) -> Self {
        self.require_id_token = require;
        self
    }

    /// Timeout applied to each outbound HTTP call.
    #[must_use]
    pub fn effective_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(self.time_limit)
    }

    /// Form body for one token request.
    ///
    /// Returns a fresh vector on every call with `code` appended to the
    /// template fields.
    #[must_use]
    pub fn token_request_form<'a>(&'a self, code: &'a str) -> Vec<(&'static str, &'a str)> {
        vec![
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
            ("grant_type", self.grant_type.as_str()),
            ("code", code),
        ]
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("token_url", &self.token_url), ("jwks_url", &self.jwks_url)] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ChallengeError::InvalidConfig(format!(
                    "{name} must be a valid HTTP(S) URL"
                )));
            }
        }

        if self.client_id.is_empty() {
            return Err(ChallengeError::InvalidConfig("client_id is required".to_string()));
        }

        if self.challenge_id.is_empty() {
            return Err(ChallengeError::InvalidConfig("challenge_id is required".to_string()));
        }

        if self.identity_claim.is_empty() {
            return Err(ChallengeError::InvalidConfig(
                "identity_claim is required".to_string(),
            ));
        }

        if self.retry_limit == 0 {
            return Err(ChallengeError::InvalidConfig(
                "retry_limit must be at least 1".to_string(),
            ));
        }

        if self.time_limit.is_zero() {
            return Err(ChallengeError::InvalidConfig(
                "time_limit must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("token_url", &self.token_url)
            .field("jwks_url", &self.jwks_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("grant_type", &self.grant_type)
            .field("challenge_id", &self.challenge_id)
            .field("time_limit", &self.time_limit)
            .field("retry_limit", &self.retry_limit)
            .field("identity_claim", &self.identity_claim)
            .field("expected_issuer", &self.expected_issuer)
            .field("expected_audience", &self.expected_audience)
            .field("require_id_token", &self.require_id_token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> ExchangeConfig {
        ExchangeConfig::google("client-123", "shh", "https://ca.example.com/callback")
    }

    #[test]
    fn test_google_defaults() {
        let config = config();
        assert_eq!(config.token_url, "https://oauth2.googleapis.com/token");
        assert_eq!(config.jwks_url, "https://www.googleapis.com/oauth2/v3/certs");
        assert_eq!(config.challenge_id, "google-oidc");
        assert_eq!(config.time_limit, Duration::from_secs(60));
        assert_eq!(config.retry_limit, 1);
        assert_eq!(config.scope, "openid");
        assert_eq!(config.grant_type, "authorization_code");
        assert_eq!(config.identity_claim, "email");
        assert!(!config.require_id_token);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = config()
            .with_challenge_id("campus-oidc")
            .with_time_limit(Duration::from_secs(300))
            .with_retry_limit(3)
            .with_identity_claim("sub")
            .with_expected_issuer("https://accounts.google.com")
            .with_expected_audience("client-123")
            .with_request_timeout(Duration::from_secs(5))
            .with_request_header("X-Trace", "1");

        assert_eq!(config.challenge_id, "campus-oidc");
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.identity_claim, "sub");
        assert_eq!(config.effective_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_headers, vec![("X-Trace".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_timeout_falls_back_to_time_limit() {
        let config = config().with_time_limit(Duration::from_secs(90));
        assert_eq!(config.effective_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_token_request_form_is_fresh_per_code() {
        let config = config();
        let first = config.token_request_form("code-1");
        let second = config.token_request_form("code-2");

        assert_eq!(first.last(), Some(&("code", "code-1")));
        assert_eq!(second.iter().filter(|(k, _)| *k == "code").count(), 1);
        assert_eq!(second.last(), Some(&("code", "code-2")));
        assert!(second.contains(&("client_secret", "shh")));
        assert!(second.contains(&("redirect_uri", "https://ca.example.com/callback")));
    }

    #[test]
    fn test_validation() {
        assert!(config().with_retry_limit(0).validate().is_err());
        assert!(config().with_time_limit(Duration::ZERO).validate().is_err());
        assert!(config().with_identity_claim("").validate().is_err());

        let mut bad_url = config();
        bad_url.jwks_url = "ftp://example.com/certs".to_string();
        assert!(bad_url.validate().is_err());

        let mut no_client = config();
        no_client.client_id.clear();
        assert!(no_client.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("OIDC_CLIENT_ID", "client-123"),
            ("OIDC_CLIENT_SECRET", "shh"),
            ("OIDC_REDIRECT_URI", "https://ca.example.com/callback"),
            ("OIDC_TOKEN_URL", "http://localhost:8080/token"),
        ]
        .into_iter()
        .collect();

        let config =
            ExchangeConfig::from_lookup(|name| vars.get(name).map(|v| (*v).to_string())).unwrap();
        assert_eq!(config.token_url, "http://localhost:8080/token");
        assert_eq!(config.jwks_url, "https://www.googleapis.com/oauth2/v3/certs");
        assert_eq!(config.challenge_id, "google-oidc");
    }

    #[test]
    fn test_from_lookup_missing_secret() {
        let result = ExchangeConfig::from_lookup(|name| match name {
            "OIDC_CLIENT_ID" => Some("client-123".to_string()),
            _ => None,
        });
        assert_eq!(
            result.unwrap_err(),
            ChallengeError::InvalidConfig("OIDC_CLIENT_SECRET is not set".to_string())
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let printed = format!("{:?}", config());
        assert!(!printed.contains("shh"));
        assert!(printed.contains("client-123"));
    }
}
