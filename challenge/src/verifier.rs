//! ID token verification.

use crate::config::ExchangeConfig;
use crate::error::{ChallengeError, Result};
use crate::jwks::JwksCache;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Verifies identity tokens and returns their claims.
pub trait IdTokenVerifier: Send + Sync {
    /// Verify `id_token` and decode its claims.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The token is malformed or its signature does not verify
    /// - The token is expired or issued for another party
    /// - The key set cannot be fetched
    fn verify(&self, id_token: &str) -> impl Future<Output = Result<IdTokenClaims>> + Send;
}

/// Standard OIDC ID token claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (provider user identifier)
    pub sub: Option<String>,
    /// Issuer
    pub iss: Option<String>,
    /// Audience (can be string or array)
    #[serde(default)]
    pub aud: Audience,
    /// Expiration time
    pub exp: Option<u64>,
    /// Not before
    pub nbf: Option<u64>,
    /// Issued at
    pub iat: Option<u64>,
    /// Email
    pub email: Option<String>,
    /// Email verified
    pub email_verified: Option<bool>,
    /// Name
    pub name: Option<String>,
    /// Additional claims
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl IdTokenClaims {
    /// Claims with only an email address, for tests and mocks.
    #[must_use]
    pub fn for_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            email_verified: Some(true),
            ..Self::default()
        }
    }

    /// Value of claim `name` as a string.
    ///
    /// Numbers are rendered in decimal; other non-string values yield `None`.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<String> {
        match name {
            "sub" => self.sub.clone(),
            "iss" => self.iss.clone(),
            "email" => self.email.clone(),
            "name" => self.name.clone(),
            _ => self.extra.get(name).and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
        }
    }
}

/// Audience can be a single string or array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// No audience claim.
    #[default]
    None,
    /// Single audience.
    Single(String),
    /// Several audiences.
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `aud` is among the audiences.
    #[must_use]
    pub fn contains(&self, aud: &str) -> bool {
        match self {
            Self::None => false,
            Self::Single(s) => s == aud,
            Self::Multiple(v) => v.iter().any(|a| a == aud),
        }
    }
}

/// Verifier backed by a remote JWKS.
pub struct JwksVerifier {
    keys: JwksCache,
    issuer: Option<String>,
    audience: Option<String>,
    leeway: Duration,
}

impl JwksVerifier {
    /// Create a verifier for `config`, sharing `http_client` for key fetches.
    #[must_use]
    pub fn new(config: &ExchangeConfig, http_client: reqwest::Client) -> Self {
        Self {
            keys: JwksCache::new(config.jwks_url.clone(), http_client, config.jwks_ttl),
            issuer: config.expected_issuer.clone(),
            audience: config.expected_audience.clone(),
            leeway: config.clock_skew,
        }
    }

    /// Create a verifier with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::InvalidConfig`] if the HTTP client cannot
    /// be built.
    pub fn from_config(config: &ExchangeConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.effective_timeout())
            .build()
            .map_err(|e| ChallengeError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::new(config, http_client))
    }

    /// The underlying key cache.
    #[must_use]
    pub const fn keys(&self) -> &JwksCache {
        &self.keys
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.leeway.as_secs();
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp"]);

        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        if let Some(ref audience) = self.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }

        validation
    }
}

impl IdTokenVerifier for JwksVerifier {
    async fn verify(&self, id_token: &str) -> Result<IdTokenClaims> {
        let header = decode_header(id_token)
            .map_err(|e| ChallengeError::TokenInvalid(format!("Failed to decode token header: {e}")))?;

        tracing::debug!(kid = ?header.kid, alg = ?header.alg, "Validating ID token");

        // A shared secret cannot come from a public key set.
        if matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ChallengeError::TokenInvalid(format!(
                "Symmetric algorithm {:?} not accepted",
                header.alg
            )));
        }

        let key = self.keys.key_for(header.kid.as_deref(), header.alg).await?;
        if !key.supports(header.alg) {
            return Err(ChallengeError::TokenInvalid(format!(
                "Key does not permit algorithm {:?}",
                header.alg
            )));
        }

        let token_data = decode::<IdTokenClaims>(id_token, &key.key, &self.validation(header.alg))
            .map_err(|e| ChallengeError::TokenInvalid(format!("Token validation failed: {e}")))?;

        tracing::debug!(iss = ?token_data.claims.iss, "ID token verified");
        Ok(token_data.claims)
    }
}
