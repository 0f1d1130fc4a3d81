//! Challenge constants.
//!
//! Parameter names and the defaults the Google-backed CA deployment uses.

/// Challenge parameter names exchanged between requester and CA.
pub mod parameters {
    /// Opaque client-chosen identifier.
    pub const OIDC_ID: &str = "oidc-id";

    /// Authorization code obtained from the identity provider.
    pub const ACCESS_CODE: &str = "access-code";
}

/// Google identity platform endpoints.
pub mod google {
    /// Challenge identifier advertised in the CA profile.
    pub const CHALLENGE_ID: &str = "google-oidc";

    /// OAuth 2.0 token endpoint.
    pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

    /// Public key set used to sign ID tokens.
    pub const JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
}

/// Default challenge time limit in seconds.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 60;

/// Default number of attempts per session.
pub const DEFAULT_RETRY_LIMIT: u32 = 1;

/// Default claim bound to the certificate subject.
pub const DEFAULT_IDENTITY_CLAIM: &str = "email";

/// Default key set cache lifetime in seconds.
pub const DEFAULT_JWKS_TTL_SECS: u64 = 3600;

/// Clock skew tolerated on `exp`/`nbf`, in seconds.
pub const CLOCK_SKEW_SECS: u64 = 30;
