//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! Keys are fetched on first use, kept for the configured TTL, and refetched
//! once when a token names an unknown key id.
//!
//! Known limitation: there is no background refresh and no negative caching,
//! so a stream of tokens with bogus key ids costs one fetch each. Fetches are
//! not coalesced either: when the cache is cold or stale, every concurrent
//! verification refreshes on its own.

use crate::error::{ChallengeError, Result};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// JWKS response from the endpoint.
#[derive(Debug, Deserialize)]
pub struct Jwks {
    /// Published keys.
    pub keys: Vec<Jwk>,
}

/// Individual JSON Web Key.
#[derive(Debug, Deserialize)]
pub struct Jwk {
    /// Key type (RSA, EC, OKP)
    pub kty: String,
    /// Key ID
    pub kid: Option<String>,
    /// Algorithm
    pub alg: Option<String>,
    /// Key use (sig, enc)
    #[serde(rename = "use")]
    pub key_use: Option<String>,

    // RSA parameters
    /// RSA modulus (base64url)
    pub n: Option<String>,
    /// RSA exponent (base64url)
    pub e: Option<String>,

    // EC / OKP parameters
    /// Curve
    pub crv: Option<String>,
    /// X coordinate (base64url)
    pub x: Option<String>,
    /// Y coordinate (base64url)
    pub y: Option<String>,
}

/// A usable verification key.
#[derive(Clone)]
pub struct CachedKey {
    /// Key id, if the set named it.
    pub kid: Option<String>,
    /// Algorithm pinned by the set, if any.
    pub algorithm: Option<Algorithm>,
    /// Key type the key was built from.
    pub kty: String,
    /// Verification key.
    pub key: DecodingKey,
}

impl CachedKey {
    /// Whether this key can verify tokens signed with `alg`.
    #[must_use]
    pub fn supports(&self, alg: Algorithm) -> bool {
        if let Some(pinned) = self.algorithm {
            return pinned == alg;
        }
        matches!(
            (self.kty.as_str(), alg),
            (
                "RSA",
                Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
            ) | ("EC", Algorithm::ES256 | Algorithm::ES384)
                | ("OKP", Algorithm::EdDSA)
        )
    }
}

#[derive(Default)]
struct CacheState {
    keys: Vec<CachedKey>,
    fetched_at: Option<Instant>,
}

/// JWKS cache, one per verifier.
pub struct JwksCache {
    jwks_url: String,
    http_client: reqwest::Client,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl JwksCache {
    /// Create an empty cache. Nothing is fetched until a key is needed.
    #[must_use]
    pub fn new(jwks_url: impl Into<String>, http_client: reqwest::Client, ttl: Duration) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            http_client,
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Key set endpoint.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Find the key for a token header.
    ///
    /// With `kid`, the key with that id. Without, the only key if the set has
    /// exactly one, else the first key supporting `alg`.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::KeySetUnavailable`] if the set cannot be
    /// fetched and [`ChallengeError::TokenInvalid`] if no key matches.
    pub async fn key_for(&self, kid: Option<&str>, alg: Algorithm) -> Result<CachedKey> {
        let mut refreshed = false;
        if self.is_stale()? {
            self.refresh().await?;
            refreshed = true;
        }

        if let Some(key) = self.lookup(kid, alg)? {
            return Ok(key);
        }

        if !refreshed {
            tracing::debug!(kid = ?kid, "Key not found in cache, refreshing JWKS");
            self.refresh().await?;
            if let Some(key) = self.lookup(kid, alg)? {
                return Ok(key);
            }
        }

        Err(ChallengeError::TokenInvalid(match kid {
            Some(kid) => format!("Key with kid '{kid}' not found in JWKS"),
            None => format!("No JWKS key supports {alg:?}"),
        }))
    }

    /// Fetch the key set and replace the cache.
    ///
    /// Returns the number of usable keys.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::KeySetUnavailable`] on network failure, a
    /// non-2xx status, a malformed body, or a set with no usable key.
    pub async fn refresh(&self) -> Result<usize> {
        let result = self.fetch().await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!("oidc_challenge.jwks.refresh", "result" => outcome).increment(1);

        let keys = result?;
        let key_count = keys.len();
        {
            let mut state = self.write_state()?;
            state.keys = keys;
            state.fetched_at = Some(Instant::now());
        }

        tracing::info!(url = %self.jwks_url, key_count, "JWKS cache refreshed");
        Ok(key_count)
    }

    async fn fetch(&self) -> Result<Vec<CachedKey>> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| ChallengeError::KeySetUnavailable(format!("Failed to fetch JWKS: {e}")))?;

        if !response.status().is_success() {
            return Err(ChallengeError::KeySetUnavailable(format!(
                "JWKS endpoint returned status {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| ChallengeError::KeySetUnavailable(format!("Failed to parse JWKS: {e}")))?;

        let keys = Self::usable_keys(jwks);
        if keys.is_empty() {
            return Err(ChallengeError::KeySetUnavailable(
                "No valid signing keys found in JWKS".to_string(),
            ));
        }
        Ok(keys)
    }

    fn usable_keys(jwks: Jwks) -> Vec<CachedKey> {
        let mut keys = Vec::with_capacity(jwks.keys.len());
        for jwk in jwks.keys {
            // Skip encryption keys
            if jwk.key_use.as_deref() == Some("enc") {
                continue;
            }

            let algorithm = match jwk.alg.as_deref().map(Algorithm::from_str).transpose() {
                Ok(algorithm) => algorithm,
                Err(e) => {
                    tracing::warn!(kid = ?jwk.kid, alg = ?jwk.alg, error = %e, "Unknown JWK algorithm, skipping");
                    continue;
                }
            };

            match Self::jwk_to_decoding_key(&jwk) {
                Ok(key) => {
                    tracing::debug!(kid = ?jwk.kid, kty = %jwk.kty, "Loaded JWK");
                    keys.push(CachedKey {
                        kid: jwk.kid,
                        algorithm,
                        kty: jwk.kty,
                        key,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        kid = ?jwk.kid,
                        kty = %jwk.kty,
                        error = %e,
                        "Failed to parse JWK, skipping"
                    );
                }
            }
        }
        keys
    }

    /// Convert a JWK to a `DecodingKey`.
    fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey> {
        let missing = |param: &str| ChallengeError::KeySetUnavailable(format!("{} key missing '{param}'", jwk.kty));
        let invalid = |e: jsonwebtoken::errors::Error| ChallengeError::KeySetUnavailable(format!("Invalid {} key: {e}", jwk.kty));

        match jwk.kty.as_str() {
            "RSA" => {
                let n = jwk.n.as_deref().ok_or_else(|| missing("n"))?;
                let e = jwk.e.as_deref().ok_or_else(|| missing("e"))?;
                DecodingKey::from_rsa_components(n, e).map_err(invalid)
            }
            "EC" => {
                let crv = jwk.crv.as_deref().ok_or_else(|| missing("crv"))?;
                if !matches!(crv, "P-256" | "P-384") {
                    return Err(ChallengeError::KeySetUnavailable(format!(
                        "Unsupported EC curve: {crv}"
                    )));
                }
                let x = jwk.x.as_deref().ok_or_else(|| missing("x"))?;
                let y = jwk.y.as_deref().ok_or_else(|| missing("y"))?;
                DecodingKey::from_ec_components(x, y).map_err(invalid)
            }
            "OKP" => {
                if jwk.crv.as_deref() != Some("Ed25519") {
                    return Err(ChallengeError::KeySetUnavailable(format!(
                        "Unsupported OKP curve: {:?}",
                        jwk.crv
                    )));
                }
                let x = jwk.x.as_deref().ok_or_else(|| missing("x"))?;
                DecodingKey::from_ed_components(x).map_err(invalid)
            }
            kty => Err(ChallengeError::KeySetUnavailable(format!(
                "Unsupported key type: {kty}"
            ))),
        }
    }

    fn is_stale(&self) -> Result<bool> {
        let state = self.read_state()?;
        Ok(state
            .fetched_at
            .is_none_or(|fetched_at| fetched_at.elapsed() >= self.ttl))
    }

    fn lookup(&self, kid: Option<&str>, alg: Algorithm) -> Result<Option<CachedKey>> {
        let state = self.read_state()?;
        let found = match kid {
            Some(kid) => state
                .keys
                .iter()
                .find(|key| key.kid.as_deref() == Some(kid)),
            None if state.keys.len() == 1 => state.keys.first(),
            None => state.keys.iter().find(|key| key.supports(alg)),
        };
        Ok(found.cloned())
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, CacheState>> {
        self.state
            .read()
            .map_err(|_| ChallengeError::Internal("JWKS cache lock poisoned".to_string()))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, CacheState>> {
        self.state
            .write()
            .map_err(|_| ChallengeError::Internal("JWKS cache lock poisoned".to_string()))
    }
}
