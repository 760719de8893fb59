//! JWKS (JSON Web Key Set) fetching and caching
//!
//! - **TTL-based caching**: a fetched set is reused until its TTL passes
//! - **Refresh on unknown key id**: one forced refresh handles key rotation
//! - **Rate limiting**: forced refreshes are spaced out
//! - **Bounded fetches**: the HTTP client carries the configured timeout
//!
//! HTTPS is required for the endpoint; plain HTTP is accepted only for
//! loopback hosts. The check happens at construction so a bad URL fails
//! startup, not the first request.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::{Host, Url};

use crate::error::{ConfigError, VerifyError};

/// Minimum spacing between forced refreshes
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// JWKS cache entry with metadata
#[derive(Debug, Clone)]
struct CachedJwks {
    /// The JWK set
    jwks: JwkSet,
    /// When this was cached
    cached_at: SystemTime,
    /// TTL for this cache entry
    ttl: Duration,
}

impl CachedJwks {
    fn is_valid(&self) -> bool {
        match SystemTime::now().duration_since(self.cached_at) {
            Ok(age) => age < self.ttl,
            Err(_) => false, // Clock went backwards, invalidate
        }
    }
}

/// Client for one key-set endpoint
///
/// Clones share the cache.
///
/// ```rust,no_run
/// # use mcpgate_auth::jwt::JwksClient;
/// # use std::time::Duration;
/// # tokio_test::block_on(async {
/// let client = JwksClient::new(
///     "https://login.microsoftonline.com/common/discovery/keys",
///     Duration::from_secs(3600),
///     Duration::from_secs(5),
/// )?;
///
/// let jwk = client.find_key("key-id-123").await?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct JwksClient {
    /// JWKS endpoint URL
    jwks_uri: String,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CachedJwks>>>,
    /// HTTP client (carries the fetch timeout)
    http_client: reqwest::Client,
    /// Cache TTL
    cache_ttl: Duration,
    /// Last forced refresh
    last_refresh: Arc<RwLock<Option<SystemTime>>>,
}

impl JwksClient {
    /// Create a client for `jwks_uri`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL does not parse, is not HTTPS (outside
    /// loopback), or the HTTP client cannot be built.
    pub fn new(
        jwks_uri: impl Into<String>,
        cache_ttl: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let jwks_uri = jwks_uri.into();
        check_endpoint(&jwks_uri)?;

        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| ConfigError::invalid(&jwks_uri, format!("HTTP client: {e}")))?;

        Ok(Self {
            jwks_uri,
            cache: Arc::new(RwLock::new(None)),
            http_client,
            cache_ttl,
            last_refresh: Arc::new(RwLock::new(None)),
        })
    }

    /// Get JWKS (from cache or fetch if needed)
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeySourceUnavailable`] if the endpoint is unreachable,
    /// answers with an error status, or returns something that is not a key set.
    pub async fn get_jwks(&self) -> Result<JwkSet, VerifyError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.is_valid()
            {
                debug!(jwks_uri = %self.jwks_uri, "Using cached JWKS");
                return Ok(cached.jwks.clone());
            }
        }

        self.fetch_and_cache().await
    }

    /// Force a refresh, unless one happened within the rate-limit window
    ///
    /// # Errors
    ///
    /// Same as [`get_jwks`](Self::get_jwks).
    pub async fn refresh(&self) -> Result<JwkSet, VerifyError> {
        {
            let last_refresh = self.last_refresh.read().await;
            if let Some(last) = *last_refresh
                && let Ok(since_last) = SystemTime::now().duration_since(last)
                && since_last < MIN_REFRESH_INTERVAL
            {
                warn!(
                    jwks_uri = %self.jwks_uri,
                    since_last_ms = since_last.as_millis(),
                    "JWKS refresh rate limited, using cache"
                );
                return self.get_jwks().await;
            }
        }

        self.fetch_and_cache().await
    }

    /// Find the key with `kid`, refreshing once if it is not in the cached set
    ///
    /// # Errors
    ///
    /// [`VerifyError::KeySourceUnavailable`] if the set cannot be fetched or
    /// does not contain `kid` even after a refresh.
    pub async fn find_key(&self, kid: &str) -> Result<Jwk, VerifyError> {
        let jwks = self.get_jwks().await?;
        if let Some(jwk) = jwks.find(kid) {
            return Ok(jwk.clone());
        }

        debug!(jwks_uri = %self.jwks_uri, kid, "Key id not in cached JWKS, refreshing");
        let jwks = self.refresh().await?;
        jwks.find(kid).cloned().ok_or_else(|| {
            warn!(jwks_uri = %self.jwks_uri, kid, "Key id not found in JWKS");
            VerifyError::KeySourceUnavailable(format!("no key with id {kid}"))
        })
    }

    async fn fetch_and_cache(&self) -> Result<JwkSet, VerifyError> {
        info!(jwks_uri = %self.jwks_uri, "Fetching JWKS from endpoint");

        let response = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| {
                error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to fetch JWKS");
                VerifyError::KeySourceUnavailable(format!("JWKS fetch failed: {e}"))
            })?;

        if !response.status().is_success() {
            error!(
                jwks_uri = %self.jwks_uri,
                status = %response.status(),
                "JWKS endpoint returned error status"
            );
            return Err(VerifyError::KeySourceUnavailable(format!(
                "JWKS endpoint returned status {}",
                response.status()
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            error!(jwks_uri = %self.jwks_uri, error = %e, "Failed to parse JWKS JSON");
            VerifyError::KeySourceUnavailable(format!("Invalid JWKS format: {e}"))
        })?;

        info!(
            jwks_uri = %self.jwks_uri,
            key_count = jwks.keys.len(),
            "Successfully fetched JWKS"
        );

        let now = SystemTime::now();
        *self.cache.write().await = Some(CachedJwks {
            jwks: jwks.clone(),
            cached_at: now,
            ttl: self.cache_ttl,
        });
        *self.last_refresh.write().await = Some(now);

        Ok(jwks)
    }

    /// Get the JWKS endpoint URI
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }
}

fn check_endpoint(jwks_uri: &str) -> Result<(), ConfigError> {
    let url = Url::parse(jwks_uri)
        .map_err(|e| ConfigError::invalid(jwks_uri, format!("invalid JWKS URL: {e}")))?;

    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };

    match url.scheme() {
        "https" => Ok(()),
        "http" if loopback => Ok(()),
        _ => Err(ConfigError::invalid(
            jwks_uri,
            "JWKS endpoint must use HTTPS (HTTP only allowed for loopback hosts)",
        )),
    }
}
