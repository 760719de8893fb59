//! Verification key resolution for the claims strategy

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::DecodingKey;

use super::jwks::JwksClient;
use crate::config::{self, KeySourceConfig};
use crate::error::{ConfigError, VerifyError};

/// Resolved key source
#[derive(Clone)]
pub enum KeySource {
    /// No keys; decode-only anchors
    None,
    /// One fixed key (HMAC secret or PEM public key)
    Static(Arc<DecodingKey>),
    /// Remote key set, selected by the token's `kid`
    Jwks(JwksClient),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("KeySource::None"),
            Self::Static(_) => f.write_str("KeySource::Static"),
            Self::Jwks(client) => f
                .debug_tuple("KeySource::Jwks")
                .field(&client.jwks_uri())
                .finish(),
        }
    }
}

impl KeySource {
    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparsable PEM or an unacceptable JWKS URL.
    pub fn from_config(
        strategy: &str,
        source: &KeySourceConfig,
        fetch_timeout: std::time::Duration,
    ) -> Result<Self, ConfigError> {
        let key_material = |e: jsonwebtoken::errors::Error| ConfigError::KeyMaterial {
            strategy: strategy.to_string(),
            reason: e.to_string(),
        };

        Ok(match source {
            KeySourceConfig::None => Self::None,
            KeySourceConfig::Jwks { uri, cache_ttl } => {
                Self::Jwks(JwksClient::new(uri.clone(), *cache_ttl, fetch_timeout)?)
            }
            KeySourceConfig::Hmac { secret } => Self::Static(Arc::new(DecodingKey::from_secret(
                config::expose(secret).as_bytes(),
            ))),
            KeySourceConfig::RsaPem { pem } => Self::Static(Arc::new(
                DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(key_material)?,
            )),
            KeySourceConfig::EcPem { pem } => Self::Static(Arc::new(
                DecodingKey::from_ec_pem(pem.as_bytes()).map_err(key_material)?,
            )),
        })
    }

    /// Whether this source can verify anything
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Resolve the key for a token with header key id `kid`
    ///
    /// # Errors
    ///
    /// - [`VerifyError::MissingRequiredClaim`] when a key set needs `kid` and the header has none
    /// - [`VerifyError::KeySourceUnavailable`] when the set cannot be fetched, lacks the key,
    ///   or there is no key source at all
    pub async fn resolve(&self, kid: Option<&str>) -> Result<DecodingKey, VerifyError> {
        match self {
            Self::None => Err(VerifyError::KeySourceUnavailable(
                "no key source configured".to_string(),
            )),
            Self::Static(key) => Ok(key.as_ref().clone()),
            Self::Jwks(client) => {
                let kid = kid.ok_or_else(|| VerifyError::MissingRequiredClaim("kid".to_string()))?;
                let jwk = client.find_key(kid).await?;
                DecodingKey::from_jwk(&jwk)
                    .map_err(|e| VerifyError::KeySourceUnavailable(format!("unusable JWK {kid}: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_none_source_is_unavailable() {
        let source = KeySource::from_config("t", &KeySourceConfig::None, Duration::from_secs(1)).unwrap();
        assert!(source.is_none());
        assert!(matches!(
            source.resolve(Some("k")).await,
            Err(VerifyError::KeySourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_hmac_source_ignores_kid() {
        let source = KeySource::from_config(
            "t",
            &KeySourceConfig::hmac("test_secret_key_at_least_32_bytes_long_12345678"),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(source.resolve(None).await.is_ok());
    }

    #[test]
    fn test_bad_pem_is_config_error() {
        let err = KeySource::from_config(
            "t",
            &KeySourceConfig::RsaPem {
                pem: "not a pem".to_string(),
            },
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::KeyMaterial { .. }));
    }

    #[test]
    fn test_plain_http_jwks_rejected() {
        let err = KeySource::from_config(
            "t",
            &KeySourceConfig::jwks("http://auth.example.com/jwks"),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
