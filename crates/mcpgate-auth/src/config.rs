//! Verifier Configuration Types
//!
//! Everything a [`CompositeVerifier`](crate::CompositeVerifier) is built from.
//! The types deserialize from any `serde` source; the server binary loads
//! them from TOML with environment overrides.
//!
//! ```toml
//! required_scopes = ["user"]
//! key_fetch_timeout = 5
//!
//! [[strategies]]
//! type = "allow_list"
//! name = "demo"
//! tokens = ["demo-token"]
//! identity = { client_id = "demo-client", subject = "demo-user", scopes = ["user"] }
//!
//! [[strategies]]
//! type = "claims"
//! name = "entra"
//! issuer = "https://login.microsoftonline.com/<tenant>/v2.0"
//! key_source = { kind = "jwks", uri = "https://login.microsoftonline.com/common/discovery/keys" }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::scope::{BASELINE_SCOPE, ScopeMapping};
use crate::types::{IdentityFields, ScopeSet, scope_set};

/// Default timeout for fetching a remote key set
pub const DEFAULT_KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default lifetime of a cached key set
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Top-level verifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Strategies, tried in this order
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    /// Scopes every accepted identity must hold, regardless of strategy
    #[serde(default)]
    pub required_scopes: ScopeSet,
    /// Upper bound on one remote key-set fetch (seconds)
    #[serde(default = "default_key_fetch_timeout", with = "duration_secs")]
    pub key_fetch_timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            strategies: Vec::new(),
            required_scopes: ScopeSet::new(),
            key_fetch_timeout: DEFAULT_KEY_FETCH_TIMEOUT,
        }
    }
}

/// One verification strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Signed structured tokens checked against a trust anchor
    Claims(TrustAnchor),
    /// Opaque keys, each bound to its own identity
    KeyTable(KeyTableConfig),
    /// Opaque tokens sharing one identity
    AllowList(AllowListConfig),
}

impl StrategyConfig {
    /// Configured strategy name
    pub fn name(&self) -> &str {
        match self {
            Self::Claims(anchor) => &anchor.name,
            Self::KeyTable(table) => &table.name,
            Self::AllowList(list) => &list.name,
        }
    }
}

/// Whether a claims strategy checks signatures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Verify the signature against the key source
    #[default]
    Verify,
    /// Read claims without checking the signature. Development only.
    DecodeOnly,
}

/// Claim names a trust anchor reads identity fields from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimNames {
    /// Subject claim
    #[serde(default = "default_subject_claim")]
    pub subject: String,
    /// Client identifier claims, first present wins
    #[serde(default = "default_client_id_claims")]
    pub client_id: Vec<String>,
    /// Scope claims, first present wins
    #[serde(default = "default_scope_claims")]
    pub scope: Vec<String>,
}

impl Default for ClaimNames {
    fn default() -> Self {
        Self {
            subject: default_subject_claim(),
            client_id: default_client_id_claims(),
            scope: default_scope_claims(),
        }
    }
}

fn default_subject_claim() -> String {
    "sub".to_string()
}

fn default_client_id_claims() -> Vec<String> {
    vec!["azp".to_string(), "client_id".to_string(), "appid".to_string()]
}

fn default_scope_claims() -> Vec<String> {
    vec!["scope".to_string(), "scp".to_string()]
}

/// Where a claims strategy gets verification keys
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeySourceConfig {
    /// No key material; only valid with [`SignaturePolicy::DecodeOnly`]
    #[default]
    None,
    /// Remote JSON Web Key Set
    Jwks {
        /// Key set URL (HTTPS, or HTTP on loopback)
        uri: String,
        /// How long a fetched key set is reused (seconds)
        #[serde(default = "default_jwks_cache_ttl", with = "duration_secs")]
        cache_ttl: Duration,
    },
    /// Shared HMAC secret
    Hmac {
        /// Secret bytes (UTF-8)
        #[serde(
            serialize_with = "serialize_redacted",
            deserialize_with = "deserialize_secret"
        )]
        secret: SecretString,
    },
    /// RSA public key, PEM encoded
    RsaPem {
        /// PEM text
        pem: String,
    },
    /// EC public key, PEM encoded
    EcPem {
        /// PEM text
        pem: String,
    },
}

impl fmt::Debug for KeySourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Jwks { uri, cache_ttl } => f
                .debug_struct("Jwks")
                .field("uri", uri)
                .field("cache_ttl", cache_ttl)
                .finish(),
            Self::Hmac { .. } => f
                .debug_struct("Hmac")
                .field("secret", &"[REDACTED]")
                .finish(),
            Self::RsaPem { .. } => f.write_str("RsaPem"),
            Self::EcPem { .. } => f.write_str("EcPem"),
        }
    }
}

impl KeySourceConfig {
    /// Remote key set with the default cache lifetime
    pub fn jwks(uri: impl Into<String>) -> Self {
        Self::Jwks {
            uri: uri.into(),
            cache_ttl: DEFAULT_JWKS_CACHE_TTL,
        }
    }

    /// Shared HMAC secret
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self::Hmac {
            secret: SecretString::new(secret.into()),
        }
    }
}

/// Trust configuration for one family of structured tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustAnchor {
    /// Strategy name, used in logs
    pub name: String,
    /// Expected `iss`; unchecked when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Expected `aud` member; unchecked when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Verification keys
    #[serde(default)]
    pub key_source: KeySourceConfig,
    /// Foreign scopes the token must carry before translation
    #[serde(default)]
    pub required_scopes: ScopeSet,
    /// Claim names for identity fields
    #[serde(default)]
    pub claims: ClaimNames,
    /// Scopes assumed when the token has no scope claim
    #[serde(default = "default_scopes")]
    pub default_scopes: ScopeSet,
    /// Foreign-to-local scope translation; scopes pass through untranslated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_translation: Option<ScopeMapping>,
    /// Signature handling
    #[serde(default)]
    pub signature: SignaturePolicy,
    /// Accepted signing algorithms
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerance for `exp` and `nbf` (seconds)
    #[serde(default, with = "duration_secs")]
    pub leeway: Duration,
}

fn default_scopes() -> ScopeSet {
    scope_set([BASELINE_SCOPE])
}

fn default_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256]
}

impl TrustAnchor {
    /// Create an anchor that verifies signatures from `key_source`
    pub fn new(name: impl Into<String>, key_source: KeySourceConfig) -> Self {
        let algorithms = match key_source {
            KeySourceConfig::Hmac { .. } => vec![Algorithm::HS256],
            KeySourceConfig::EcPem { .. } => vec![Algorithm::ES256],
            _ => default_algorithms(),
        };
        Self {
            name: name.into(),
            issuer: None,
            audience: None,
            key_source,
            required_scopes: ScopeSet::new(),
            claims: ClaimNames::default(),
            default_scopes: default_scopes(),
            scope_translation: None,
            signature: SignaturePolicy::Verify,
            algorithms,
            leeway: Duration::ZERO,
        }
    }

    /// Require this issuer
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Require this audience
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Require these foreign scopes
    #[must_use]
    pub fn with_required_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_scopes = scope_set(scopes);
        self
    }

    /// Set the scopes assumed when the token carries none
    #[must_use]
    pub fn with_default_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_scopes = scope_set(scopes);
        self
    }

    /// Translate scopes through `mapping`
    #[must_use]
    pub fn with_scope_translation(mut self, mapping: ScopeMapping) -> Self {
        self.scope_translation = Some(mapping);
        self
    }

    /// Override claim names
    #[must_use]
    pub fn with_claim_names(mut self, claims: ClaimNames) -> Self {
        self.claims = claims;
        self
    }

    /// Set the signature policy
    #[must_use]
    pub fn with_signature_policy(mut self, policy: SignaturePolicy) -> Self {
        self.signature = policy;
        self
    }

    /// Set accepted algorithms
    #[must_use]
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Set clock skew tolerance
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Opaque keys, each mapped to its own identity
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyTableConfig {
    /// Strategy name
    pub name: String,
    /// Key to identity
    #[serde(default)]
    pub keys: BTreeMap<String, IdentityFields>,
}

impl fmt::Debug for KeyTableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTableConfig")
            .field("name", &self.name)
            .field("keys", &format!("[{} REDACTED]", self.keys.len()))
            .finish()
    }
}

/// Opaque tokens that all resolve to one identity
#[derive(Clone, Serialize, Deserialize)]
pub struct AllowListConfig {
    /// Strategy name
    pub name: String,
    /// Accepted tokens
    #[serde(default)]
    pub tokens: Vec<String>,
    /// Identity every accepted token resolves to
    pub identity: IdentityFields,
}

impl fmt::Debug for AllowListConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowListConfig")
            .field("name", &self.name)
            .field("tokens", &format!("[{} REDACTED]", self.tokens.len()))
            .field("identity", &self.identity)
            .finish()
    }
}

fn default_key_fetch_timeout() -> Duration {
    DEFAULT_KEY_FETCH_TIMEOUT
}

fn default_jwks_cache_ttl() -> Duration {
    DEFAULT_JWKS_CACHE_TTL
}

// Secrets are never written back out
fn serialize_redacted<S>(_secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("[REDACTED]")
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(SecretString::new(s))
}

pub(crate) fn expose(secret: &SecretString) -> &str {
    secret.expose_secret()
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verifier_config_from_json() {
        let config: VerifierConfig = serde_json::from_value(json!({
            "required_scopes": ["user"],
            "strategies": [
                {
                    "type": "key_table",
                    "name": "api-keys",
                    "keys": {"mock_mcp_api_key": {"client_id": "api-key-client", "scopes": ["user"]}}
                },
                {
                    "type": "claims",
                    "name": "entra",
                    "issuer": "https://login.microsoftonline.com/tenant/v2.0",
                    "audience": "b232067f-2258-4389-84e7-9705dc203634",
                    "required_scopes": ["User.Read"],
                    "key_source": {"kind": "jwks", "uri": "https://login.microsoftonline.com/common/discovery/keys"}
                },
                {
                    "type": "allow_list",
                    "name": "demo",
                    "tokens": ["demo-token"],
                    "identity": {"client_id": "demo-client", "subject": "demo-user"}
                }
            ]
        }))
        .unwrap();

        assert_eq!(config.key_fetch_timeout, DEFAULT_KEY_FETCH_TIMEOUT);
        assert_eq!(config.strategies.len(), 3);
        let names: Vec<_> = config.strategies.iter().map(StrategyConfig::name).collect();
        assert_eq!(names, ["api-keys", "entra", "demo"]);

        let StrategyConfig::Claims(anchor) = &config.strategies[1] else {
            panic!("expected claims strategy");
        };
        assert_eq!(anchor.signature, SignaturePolicy::Verify);
        assert_eq!(anchor.default_scopes, scope_set(["authenticated"]));
        assert_eq!(anchor.claims.client_id[0], "azp");
        assert_eq!(anchor.algorithms, vec![Algorithm::RS256]);
        assert!(matches!(
            &anchor.key_source,
            KeySourceConfig::Jwks { cache_ttl, .. } if *cache_ttl == DEFAULT_JWKS_CACHE_TTL
        ));
    }

    #[test]
    fn test_hmac_secret_is_redacted() {
        let source = KeySourceConfig::hmac("very-secret-value");
        assert!(!format!("{source:?}").contains("very-secret-value"));
        let serialized = serde_json::to_string(&source).unwrap();
        assert!(!serialized.contains("very-secret-value"));
    }

    #[test]
    fn test_static_table_debug_hides_keys() {
        let table = KeyTableConfig {
            name: "keys".into(),
            keys: BTreeMap::from([("secret-key".to_string(), IdentityFields::new("c"))]),
        };
        assert!(!format!("{table:?}").contains("secret-key"));
    }

    #[test]
    fn test_trust_anchor_builder_picks_algorithm_for_hmac() {
        let anchor = TrustAnchor::new("local", KeySourceConfig::hmac("s"))
            .with_issuer("https://auth.example.com")
            .with_leeway(Duration::from_secs(30));
        assert_eq!(anchor.algorithms, vec![Algorithm::HS256]);
        assert_eq!(anchor.issuer.as_deref(), Some("https://auth.example.com"));
        assert_eq!(anchor.leeway, Duration::from_secs(30));
    }
}
