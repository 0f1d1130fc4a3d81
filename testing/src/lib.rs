//! # NDNCERT OIDC Testing
//!
//! Fixtures for exercising the OIDC challenge without a real identity
//! provider:
//!
//! - [`keys`]: fixed RSA keys, a matching JWKS document, token minting
//! - [`idp`]: a `wiremock`-backed token and key set endpoint
//! - [`init_tracing`]: log output for failing tests
//!
//! ## Example
//!
//! ```ignore
//! use ndncert_oidc_testing::{idp::MockIdentityProvider, keys};
//!
//! let idp = MockIdentityProvider::start().await;
//! idp.serve_jwks(keys::jwks(), None).await;
//! idp.serve_id_token(&keys::sign_id_token(&keys::id_token_claims("alice@example.com"))).await;
//! ```

pub mod idp;
pub mod keys;

pub use idp::MockIdentityProvider;

/// Install a `tracing` subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
