//! Mock OIDC identity provider backed by a `wiremock` server.
//!
//! Serves a token endpoint at `/token` and a key set at `/certs`.

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Path of the mock token endpoint.
pub const TOKEN_PATH: &str = "/token";

/// Path of the mock key set endpoint.
pub const JWKS_PATH: &str = "/certs";

/// Mock identity provider.
pub struct MockIdentityProvider {
    server: MockServer,
}

impl MockIdentityProvider {
    /// Start a provider with no endpoints mounted.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Underlying mock server, for custom mounts.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.server.uri())
    }

    /// Key set endpoint URL.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    /// Serve `jwks` from the key set endpoint.
    ///
    /// With `expected_fetches` set, the server asserts on drop that the key
    /// set was fetched exactly that many times.
    pub async fn serve_jwks(&self, jwks: Value, expected_fetches: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks));
        let mock = match expected_fetches {
            Some(n) => mock.expect(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    /// Answer every token request with `status` and a JSON `body`.
    pub async fn serve_token_response(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer token requests with an ID token for `id_token`.
    pub async fn serve_id_token(&self, id_token: &str) {
        self.serve_token_response(
            200,
            serde_json::json!({
                "access_token": "ya29.test-access-token",
                "expires_in": 3599,
                "token_type": "Bearer",
                "scope": "openid email",
                "id_token": id_token,
            }),
        )
        .await;
    }

    /// Requests received on the token endpoint, oldest first.
    pub async fn token_requests(&self) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == TOKEN_PATH)
            .collect()
    }
}

/// Decode a form-encoded request body into name/value pairs.
#[must_use]
pub fn form_fields(body: &[u8]) -> Vec<(String, String)> {
    serde_urlencoded::from_bytes(body).unwrap_or_default()
}

/// Look up one field in a form-encoded request body.
#[must_use]
pub fn form_field(body: &[u8], name: &str) -> Option<String> {
    form_fields(body)
        .into_iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v)
}
