//! Common test utilities for integration tests
//!
//! Token signing helpers, a mock key-set endpoint, and clocks for driving
//! verifiers through their time boundaries.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use mcpgate_auth::{
    AllowListVerifier, Clock, FixedClock, IdentityFields, KeySourceConfig, KeyTableVerifier,
    TrustAnchor,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Shared HMAC secret for statically keyed anchors
pub const HMAC_SECRET: &str = "test_secret_key_at_least_32_bytes_long_12345678";

/// Secret published through the mock key set as an `oct` key
pub const JWKS_SECRET: &[u8] = b"jwks_shared_secret_for_tests_at_least_48_bytes!!";

/// `JWKS_SECRET` base64 encoded; identical in the standard and URL-safe alphabets
pub const JWKS_SECRET_B64: &str = "andrc19zaGFyZWRfc2VjcmV0X2Zvcl90ZXN0c19hdF9sZWFzdF80OF9ieXRlcyEh";

/// Key id of the published key
pub const JWKS_KID: &str = "test-key-2026";

/// Fixed "now" used by clock-driven tests
pub const NOW: u64 = 1_700_000_000;

pub const ISSUER: &str = "https://auth.example.com";
pub const AUDIENCE: &str = "mcp-server";

/// Sign `claims` with HS256 under `secret`, optionally tagging a key id
pub fn sign_hs256(claims: &Value, secret: &[u8], kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = kid.map(str::to_string);
    encode(&header, claims, &EncodingKey::from_secret(secret)).expect("signing failed")
}

/// Well-formed claims for the test issuer and audience
pub fn valid_claims(exp: u64) -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "alice",
        "azp": "weather-app",
        "scope": "user weather:read",
        "exp": exp,
    })
}

/// Anchor verifying HS256 tokens with [`HMAC_SECRET`]
pub fn hmac_anchor(name: &str) -> TrustAnchor {
    TrustAnchor::new(name, KeySourceConfig::hmac(HMAC_SECRET))
        .with_issuer(ISSUER)
        .with_audience(AUDIENCE)
}

/// Anchor verifying HS256 tokens against a key-set endpoint
pub fn jwks_anchor(name: &str, uri: &str) -> TrustAnchor {
    TrustAnchor::new(name, KeySourceConfig::jwks(uri))
        .with_issuer(ISSUER)
        .with_audience(AUDIENCE)
        .with_algorithms(vec![Algorithm::HS256])
}

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::at_unix(NOW))
}

pub fn demo_allow_list() -> AllowListVerifier {
    AllowListVerifier::new(
        "demo",
        ["demo-token"],
        IdentityFields::new("demo-client")
            .with_subject("demo-user")
            .with_scopes(["user", "weather:read"]),
    )
}

pub fn api_key_table() -> KeyTableVerifier {
    KeyTableVerifier::new(
        "api-keys",
        [(
            "mock_mcp_api_key",
            IdentityFields::new("api-key-client").with_scopes(["user", "weather:read"]),
        )],
    )
}

/// Clock that panics when read
#[derive(Debug)]
pub struct PanickingClock;

impl Clock for PanickingClock {
    fn now(&self) -> SystemTime {
        panic!("clock exploded")
    }
}

/// Mock key-set endpoint
pub struct MockJwksServer {
    pub server: MockServer,
    pub jwks_uri: String,
}

impl MockJwksServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let jwks_uri = format!("{}/jwks", server.uri());
        Self { server, jwks_uri }
    }

    /// The published `oct` key
    pub fn oct_jwk() -> Value {
        json!({
            "kty": "oct",
            "kid": JWKS_KID,
            "alg": "HS256",
            "k": JWKS_SECRET_B64,
        })
    }

    /// Serve a key set containing the `oct` key
    pub async fn mock_keys(&self) {
        self.mock_response(
            ResponseTemplate::new(200).set_body_json(json!({ "keys": [Self::oct_jwk()] })),
        )
        .await;
    }

    /// Serve the key set after `delay`
    pub async fn mock_slow_keys(&self, delay: Duration) {
        self.mock_response(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "keys": [Self::oct_jwk()] }))
                .set_delay(delay),
        )
        .await;
    }

    pub async fn mock_status(&self, status: u16) {
        self.mock_response(ResponseTemplate::new(status)).await;
    }

    pub async fn mock_body(&self, body: &str) {
        self.mock_response(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/json"),
        )
        .await;
    }

    async fn mock_response(&self, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}
