//! Integration tests for JWKS-backed ID token verification.

use chrono::Utc;
use ndncert_oidc::{ChallengeError, ExchangeConfig, IdTokenVerifier, JwksVerifier};
use ndncert_oidc_testing::idp::{MockIdentityProvider, JWKS_PATH};
use ndncert_oidc_testing::keys::{
    self, id_token_claims, sign_id_token, sign_with, sign_with_untrusted_key, TEST_AUDIENCE,
    TEST_ISSUER, TEST_KID, TRUSTED_KEY_PEM,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn config(idp: &MockIdentityProvider) -> ExchangeConfig {
    ExchangeConfig::new(
        idp.token_url(),
        idp.jwks_url(),
        TEST_AUDIENCE,
        "test-secret",
        "https://ca.example.com/callback",
    )
}

fn verifier(config: &ExchangeConfig) -> JwksVerifier {
    JwksVerifier::from_config(config).unwrap()
}

#[tokio::test]
async fn test_valid_token_yields_claims() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), Some(1)).await;

    let token = sign_id_token(&id_token_claims("alice@example.com"));
    let claims = verifier(&config(&idp)).verify(&token).await.unwrap();

    assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
    assert_eq!(claims.iss.as_deref(), Some(TEST_ISSUER));
    assert_eq!(claims.email_verified, Some(true));
}

#[tokio::test]
async fn test_keys_fetched_lazily_and_cached() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), Some(1)).await;

    let verifier = verifier(&config(&idp));
    assert!(idp.server().received_requests().await.unwrap_or_default().is_empty());

    for email in ["alice@example.com", "bob@example.com", "carol@example.com"] {
        let token = sign_id_token(&id_token_claims(email));
        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.email.as_deref(), Some(email));
    }
    // `expect(1)` on the JWKS mock is checked when `idp` drops.
}

#[tokio::test]
async fn test_expired_ttl_refetches_keys() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), Some(2)).await;

    let verifier = verifier(&config(&idp).with_jwks_ttl(Duration::ZERO));
    let token = sign_id_token(&id_token_claims("alice@example.com"));

    verifier.verify(&token).await.unwrap();
    verifier.verify(&token).await.unwrap();
}

#[tokio::test]
async fn test_untrusted_signature_rejected() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), None).await;

    let token = sign_with_untrusted_key(&id_token_claims("mallory@example.com"));
    let result = verifier(&config(&idp)).verify(&token).await;

    assert!(matches!(result, Err(ChallengeError::TokenInvalid(_))));
}

#[tokio::test]
async fn test_tampered_payload_rejected() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), None).await;

    let token = sign_id_token(&id_token_claims("alice@example.com"));
    let forged_token = sign_id_token(&id_token_claims("mallory@example.com"));
    let mut parts: Vec<&str> = token.split('.').collect();
    let forged_payload = forged_token.split('.').nth(1).unwrap();
    parts[1] = forged_payload;
    let tampered = parts.join(".");

    let result = verifier(&config(&idp)).verify(&tampered).await;

    assert!(matches!(result, Err(ChallengeError::TokenInvalid(_))));
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), None).await;

    let mut claims = id_token_claims("alice@example.com");
    let now = Utc::now().timestamp();
    claims["iat"] = json!(now - 7200);
    claims["exp"] = json!(now - 3600);
    let token = sign_id_token(&claims);

    let result = verifier(&config(&idp)).verify(&token).await;

    assert!(matches!(result, Err(ChallengeError::TokenInvalid(_))));
}

#[tokio::test]
async fn test_token_without_exp_rejected() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), None).await;

    let mut claims = id_token_claims("alice@example.com");
    claims.as_object_mut().unwrap().remove("exp");
    let token = sign_id_token(&claims);

    let result = verifier(&config(&idp)).verify(&token).await;

    assert!(matches!(result, Err(ChallengeError::TokenInvalid(_))));
}

#[tokio::test]
async fn test_issuer_and_audience_checked_when_configured() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), None).await;
    let token = sign_id_token(&id_token_claims("alice@example.com"));

    let matching = config(&idp)
        .with_expected_issuer(TEST_ISSUER)
        .with_expected_audience(TEST_AUDIENCE);
    assert!(verifier(&matching).verify(&token).await.is_ok());

    let wrong_issuer = config(&idp).with_expected_issuer("https://evil.example.com");
    assert!(matches!(
        verifier(&wrong_issuer).verify(&token).await,
        Err(ChallengeError::TokenInvalid(_))
    ));

    let wrong_audience = config(&idp).with_expected_audience("someone-else");
    assert!(matches!(
        verifier(&wrong_audience).verify(&token).await,
        Err(ChallengeError::TokenInvalid(_))
    ));
}

#[tokio::test]
async fn test_unknown_kid_refreshes_once() {
    let idp = MockIdentityProvider::start().await;
    // Two fetches: the initial load and one refresh for the unknown kid.
    idp.serve_jwks(keys::jwks(), Some(2)).await;

    let token = sign_with(TRUSTED_KEY_PEM, Some("rotated-key"), &id_token_claims("alice@example.com"));
    let verifier = verifier(&config(&idp));

    // Prime the cache so the unknown kid triggers a refresh rather than the
    // initial load.
    verifier.keys().refresh().await.unwrap();

    let result = verifier.verify(&token).await;
    assert!(matches!(result, Err(ChallengeError::TokenInvalid(_))));
}

#[tokio::test]
async fn test_token_without_kid_uses_single_key() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), None).await;

    let token = sign_with(TRUSTED_KEY_PEM, None, &id_token_claims("alice@example.com"));
    let claims = verifier(&config(&idp)).verify(&token).await.unwrap();

    assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn test_hmac_token_rejected_without_fetch() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), Some(0)).await;

    let key = jsonwebtoken::EncodingKey::from_secret(b"shared-secret");
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    let token = jsonwebtoken::encode(&header, &id_token_claims("alice@example.com"), &key).unwrap();

    let result = verifier(&config(&idp)).verify(&token).await;

    assert!(matches!(result, Err(ChallengeError::TokenInvalid(_))));
}

#[tokio::test]
async fn test_unreachable_key_set_is_unavailable() {
    let idp = MockIdentityProvider::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(idp.server())
        .await;

    let token = sign_id_token(&id_token_claims("alice@example.com"));
    let result = verifier(&config(&idp)).verify(&token).await;

    assert!(matches!(result, Err(ChallengeError::KeySetUnavailable(_))));
}

#[tokio::test]
async fn test_empty_key_set_is_unavailable() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(json!({"keys": []}), None).await;

    let token = sign_id_token(&id_token_claims("alice@example.com"));
    let result = verifier(&config(&idp)).verify(&token).await;

    assert!(matches!(result, Err(ChallengeError::KeySetUnavailable(_))));
}

const P256_X: &str = "Pj1AYXY7jSQe4smkuvBqBNfSvVTCm0czhK6S3Y4eX9o";
const P256_Y: &str = "dr2gRqajJW61g5v2V1CS0qTn-ijxfY7VSxQrJFejPiI";
const ED25519_X: &str = "eu0Op3fky7PiFvbNWng6BbcZtQwQGgnljBoEkgpHeOQ";

#[tokio::test]
async fn test_not_yet_valid_token_rejected() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(keys::jwks(), None).await;

    let mut claims = id_token_claims("alice@example.com");
    claims["nbf"] = json!(Utc::now().timestamp() + 3600);
    let token = sign_id_token(&claims);

    let result = verifier(&config(&idp)).verify(&token).await;

    assert!(matches!(result, Err(ChallengeError::TokenInvalid(_))));
}

#[tokio::test]
async fn test_token_without_kid_picks_matching_key_from_mixed_set() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(
        json!({"keys": [
            {"kty": "EC", "kid": "ec", "crv": "P-256", "x": P256_X, "y": P256_Y},
            {"kty": "RSA", "kid": "rsa-any", "use": "sig", "n": keys::TEST_MODULUS, "e": keys::TEST_EXPONENT},
            {"kty": "RSA", "kid": TEST_KID, "alg": "RS256", "use": "sig", "n": keys::TEST_MODULUS, "e": keys::TEST_EXPONENT},
        ]}),
        Some(1),
    )
    .await;

    let verifier = verifier(&config(&idp));
    assert_eq!(verifier.keys().refresh().await.unwrap(), 3);

    let token = sign_with(TRUSTED_KEY_PEM, None, &id_token_claims("alice@example.com"));
    let claims = verifier.verify(&token).await.unwrap();

    assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
}

#[tokio::test]
async fn test_ec_and_okp_keys_are_loaded() {
    let idp = MockIdentityProvider::start().await;
    idp.serve_jwks(
        json!({"keys": [
            {"kty": "EC", "kid": "ec", "alg": "ES256", "use": "sig", "crv": "P-256", "x": P256_X, "y": P256_Y},
            {"kty": "OKP", "kid": "ed", "alg": "EdDSA", "use": "sig", "crv": "Ed25519", "x": ED25519_X},
        ]}),
        None,
    )
    .await;

    let verifier = verifier(&config(&idp));

    assert_eq!(verifier.keys().refresh().await.unwrap(), 2);
    let ec = verifier
        .keys()
        .key_for(Some("ec"), jsonwebtoken::Algorithm::ES256)
        .await
        .unwrap();
    assert!(ec.supports(jsonwebtoken::Algorithm::ES256));
    let ed = verifier
        .keys()
        .key_for(Some("ed"), jsonwebtoken::Algorithm::EdDSA)
        .await
        .unwrap();
    assert_eq!(ed.kty, "OKP");
}
