//! OIDC challenge controller.
//!
//! # Flow
//!
//! ```text
//! Received → ParameterCheck ─┬─ missing ──────────────────────→ Rejected(invalid-parameters)
//!                            └─ Exchanging ─┬─ error ─────────→ Rejected(invalid-access-code)
//!                                           ├─ no id_token ───→ Accepted
//!                                           └─ Verifying ─┬─ invalid ──→ Rejected(invalid-access-code)
//!                                                         └─ Assigning ─┬─ rejected → Rejected(invalid-access-code)
//!                                                                       └─ ok ──────→ Accepted
//! ```
//!
//! Every rejection consumes one session retry. Nothing escapes `process`:
//! errors and panics below it collapse into `invalid-access-code`.

use crate::config::ExchangeConfig;
use crate::error::{ChallengeError, Result};
use crate::exchange::{HttpTokenExchanger, TokenExchanger};
use crate::outcome::{ChallengeOutcome, ChallengeStatus};
use crate::policy::AssignmentPolicy;
use crate::request::ChallengeRequest;
use crate::session::{ChallengeSession, OidcChallengeState, SubjectName};
use crate::verifier::{IdTokenVerifier, JwksVerifier};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// A challenge the issuance layer can offer to requesters.
pub trait ServerChallenge: Send + Sync {
    /// Identifier advertised in the CA profile.
    fn challenge_id(&self) -> &str;

    /// How long a session may stay open.
    fn time_limit(&self) -> Duration;

    /// Attempts allowed per session.
    fn retry_limit(&self) -> u32;

    /// Process one attempt, updating `session`.
    ///
    /// Never fails: every problem becomes a [`ChallengeOutcome::Retryable`].
    fn process(
        &self,
        request: &ChallengeRequest,
        session: &mut ChallengeSession,
    ) -> impl Future<Output = ChallengeOutcome> + Send;

    /// Open a session for `subject` with this challenge's limits.
    fn open_session(&self, subject: SubjectName) -> ChallengeSession {
        ChallengeSession::new(subject, self.retry_limit(), self.time_limit())
    }
}

/// Authorization-code challenge against an OIDC identity provider.
///
/// # Type Parameters
///
/// - `X`: token exchanger
/// - `V`: ID token verifier
/// - `P`: assignment policy
pub struct OidcChallenge<X, V, P>
where
    X: TokenExchanger,
    V: IdTokenVerifier,
    P: AssignmentPolicy,
{
    config: Arc<ExchangeConfig>,
    exchanger: X,
    verifier: V,
    policy: P,
}

impl<P: AssignmentPolicy> OidcChallenge<HttpTokenExchanger, JwksVerifier, P> {
    /// Build the production challenge from `config`.
    ///
    /// One HTTP client, bounded by [`ExchangeConfig::effective_timeout`], is
    /// shared by the exchanger and the key set fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::InvalidConfig`] if `config` fails validation
    /// or the HTTP client cannot be built.
    pub fn from_config(config: ExchangeConfig, policy: P) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.effective_timeout())
            .build()
            .map_err(|e| ChallengeError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        let config = Arc::new(config);
        let verifier = JwksVerifier::new(&config, http_client.clone());
        let exchanger = HttpTokenExchanger::with_client(http_client, Arc::clone(&config));

        Ok(Self::new(config, exchanger, verifier, policy))
    }
}

impl<X, V, P> OidcChallenge<X, V, P>
where
    X: TokenExchanger,
    V: IdTokenVerifier,
    P: AssignmentPolicy,
{
    /// Assemble a challenge from its capabilities.
    #[must_use]
    pub const fn new(config: Arc<ExchangeConfig>, exchanger: X, verifier: V, policy: P) -> Self {
        Self {
            config,
            exchanger,
            verifier,
            policy,
        }
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Token exchanger.
    #[must_use]
    pub const fn exchanger(&self) -> &X {
        &self.exchanger
    }

    /// ID token verifier.
    #[must_use]
    pub const fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Assignment policy.
    #[must_use]
    pub const fn policy(&self) -> &P {
        &self.policy
    }

    /// Exchange, verify and assign. Steps 3 to 5 of an attempt.
    async fn authenticate(&self, access_code: &[u8], subject: &SubjectName) -> Result<()> {
        let code = std::str::from_utf8(access_code).map_err(|_| ChallengeError::MalformedAccessCode)?;

        let response = self.exchanger.exchange_code(code).await?;
        if let Some(rejection) = response.rejection() {
            return Err(rejection);
        }

        let Some(id_token) = response.id_token.as_deref() else {
            if self.config.require_id_token {
                return Err(ChallengeError::MissingIdToken);
            }
            tracing::debug!("Token response carries no ID token, accepting exchange");
            return Ok(());
        };

        let claims = self.verifier.verify(id_token).await?;

        let claim = &self.config.identity_claim;
        let identity = claims
            .claim(claim)
            .ok_or_else(|| ChallengeError::MissingIdentityClaim(claim.clone()))?;

        self.policy.assign(subject, &identity).await?;
        Ok(())
    }

    fn reject(
        &self,
        session: &mut ChallengeSession,
        status: ChallengeStatus,
    ) -> ChallengeOutcome {
        let remaining_retries = session.decrement_retries();
        metrics::counter!("oidc_challenge.outcome", "status" => status.as_str()).increment(1);
        tracing::info!(
            challenge_id = %self.config.challenge_id,
            session_id = %session.session_id(),
            status = %status,
            remaining_retries,
            "OIDC challenge attempt rejected"
        );
        ChallengeOutcome::Retryable(status)
    }

    fn accept(&self, session: &ChallengeSession) -> ChallengeOutcome {
        metrics::counter!("oidc_challenge.outcome", "status" => "success").increment(1);
        tracing::info!(
            challenge_id = %self.config.challenge_id,
            session_id = %session.session_id(),
            subject = %session.subject_name(),
            "OIDC challenge succeeded"
        );
        ChallengeOutcome::Success
    }
}

impl<X, V, P> ServerChallenge for OidcChallenge<X, V, P>
where
    X: TokenExchanger,
    V: IdTokenVerifier,
    P: AssignmentPolicy,
{
    fn challenge_id(&self) -> &str {
        &self.config.challenge_id
    }

    fn time_limit(&self) -> Duration {
        self.config.time_limit
    }

    fn retry_limit(&self) -> u32 {
        self.config.retry_limit
    }

    async fn process(
        &self,
        request: &ChallengeRequest,
        session: &mut ChallengeSession,
    ) -> ChallengeOutcome {
        let (oidc_id, access_code) = match request.oidc_parameters() {
            Ok((oidc_id, access_code)) => (oidc_id.to_vec(), access_code.to_vec()),
            Err(e) => {
                tracing::warn!(session_id = %session.session_id(), error = %e, "Invalid challenge parameters");
                return self.reject(session, e.status());
            }
        };

        tracing::info!(
            session_id = %session.session_id(),
            oidc_id = %String::from_utf8_lossy(&oidc_id),
            access_code_len = access_code.len(),
            "Challenge request"
        );

        session.record_attempt(OidcChallengeState {
            oidc_id,
            access_code: access_code.clone(),
        });

        let subject = session.subject_name().clone();
        let result = AssertUnwindSafe(self.authenticate(&access_code, &subject))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => self.accept(session),
            Ok(Err(e)) => {
                if e.is_upstream() {
                    tracing::error!(session_id = %session.session_id(), error = %e, "Failed in OIDC challenge");
                } else {
                    tracing::warn!(session_id = %session.session_id(), error = %e, "Access code rejected");
                }
                self.reject(session, ChallengeStatus::InvalidAccessCode)
            }
            Err(_) => {
                tracing::error!(session_id = %session.session_id(), "OIDC challenge panicked");
                self.reject(session, ChallengeStatus::InvalidAccessCode)
            }
        }
    }
}
