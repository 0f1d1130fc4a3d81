//! # NDNCERT OIDC Challenge
//!
//! An NDNCERT challenge that proves control of an external OIDC identity
//! before the CA issues a certificate.
//!
//! The requester signs in with the identity provider out of band and submits
//! the resulting authorization code. The CA exchanges it for an ID token,
//! verifies the token against the provider's published keys, and asks an
//! [`AssignmentPolicy`] whether the verified identity may hold the requested
//! subject name.
//!
//! ## Architecture
//!
//! ```text
//! ChallengeRequest → OidcChallenge::process
//!                      ├─ TokenExchanger   (code → token response)
//!                      ├─ IdTokenVerifier  (JWT → claims, keys from JWKS)
//!                      └─ AssignmentPolicy (subject × identity → accept/reject)
//!                    → ChallengeOutcome
//! ```
//!
//! Each capability is a trait so the pipeline runs against mocks in tests
//! and against HTTP in production.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ndncert_oidc::{
//!     AllowedDomains, ChallengeRequest, ExchangeConfig, OidcChallenge, ServerChallenge,
//!     SubjectName,
//! };
//!
//! # async fn example() -> ndncert_oidc::Result<()> {
//! let config = ExchangeConfig::google("client-id", "client-secret", "https://ca.example.com/cb");
//! let challenge = OidcChallenge::from_config(config, AllowedDomains::new(["example.com"]))?;
//!
//! let mut session = challenge.open_session(SubjectName::new("/ndn/edu/example/alice"));
//! let request = ChallengeRequest::new()
//!     .with_parameter("oidc-id", "alice")
//!     .with_parameter("access-code", "4/0AbCd");
//!
//! let outcome = challenge.process(&request, &mut session).await;
//! println!("{outcome:?}, {} retries left", session.remaining_retries());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod challenge;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod exchange;
pub mod jwks;
pub mod outcome;
pub mod policy;
pub mod request;
pub mod session;
pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use challenge::{OidcChallenge, ServerChallenge};
pub use client::ClientOidcChallenge;
pub use config::ExchangeConfig;
pub use error::{ChallengeError, Result};
pub use exchange::{HttpTokenExchanger, TokenExchanger, TokenResponse};
pub use outcome::{ChallengeOutcome, ChallengeStatus};
pub use policy::{AcceptAll, AllowedDomains, AssignmentPolicy, AssignmentRejected, UniqueBinding};
pub use request::{ChallengeRequest, ParameterKV};
pub use session::{ChallengeSession, OidcChallengeState, SessionId, SubjectName};
pub use verifier::{IdTokenClaims, IdTokenVerifier, JwksVerifier};
