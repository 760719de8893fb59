//! Composite (OR) verifier
//!
//! Holds an ordered list of [`Strategy`] values and accepts a credential as
//! soon as one of them does. Order is precedence and is never changed.
//!
//! Each attempt is a failure boundary: a strategy returning an error and a
//! strategy panicking are both just that strategy declining. If an aggregate
//! required-scope set is configured, an accepted identity lacking those scopes
//! also counts as declining, and the next strategy gets its turn.
//!
//! Callers only ever see [`Rejected`]; reasons go to `debug` logs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::classify::classify;
use crate::clock::{Clock, SystemClock};
use crate::config::{StrategyConfig, VerifierConfig};
use crate::error::{ConfigError, Rejected, VerifyError};
use crate::jwt::ClaimsVerifier;
use crate::providers::{AllowListVerifier, KeyTableVerifier};
use crate::scope::missing_scopes;
use crate::server::extract_bearer;
use crate::types::{Identity, ScopeSet};

/// One verification strategy
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Structured tokens under a trust anchor
    Claims(ClaimsVerifier),
    /// Opaque keys with per-key identities
    KeyTable(KeyTableVerifier),
    /// Opaque tokens with one shared identity
    AllowList(AllowListVerifier),
}

impl Strategy {
    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a claims strategy's key source is unusable.
    pub fn from_config(
        config: &StrategyConfig,
        key_fetch_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Ok(match config {
            StrategyConfig::Claims(anchor) => Self::Claims(
                ClaimsVerifier::new(anchor.clone(), key_fetch_timeout)?.with_clock(clock),
            ),
            StrategyConfig::KeyTable(table) => Self::KeyTable(KeyTableVerifier::from_config(table)),
            StrategyConfig::AllowList(list) => Self::AllowList(AllowListVerifier::from_config(list)),
        })
    }

    /// Strategy name
    pub fn name(&self) -> &str {
        match self {
            Self::Claims(v) => v.name(),
            Self::KeyTable(v) => v.name(),
            Self::AllowList(v) => v.name(),
        }
    }

    /// Strategy kind, for logs
    pub fn method(&self) -> &'static str {
        match self {
            Self::Claims(_) => "claims",
            Self::KeyTable(_) => "key_table",
            Self::AllowList(_) => "allow_list",
        }
    }

    /// Verify with this strategy alone
    ///
    /// # Errors
    ///
    /// The strategy's reason for declining.
    pub async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        match self {
            Self::Claims(v) => v.verify(credential).await,
            Self::KeyTable(v) => v.verify(credential),
            Self::AllowList(v) => v.verify(credential),
        }
    }
}

impl From<ClaimsVerifier> for Strategy {
    fn from(v: ClaimsVerifier) -> Self {
        Self::Claims(v)
    }
}

impl From<KeyTableVerifier> for Strategy {
    fn from(v: KeyTableVerifier) -> Self {
        Self::KeyTable(v)
    }
}

impl From<AllowListVerifier> for Strategy {
    fn from(v: AllowListVerifier) -> Self {
        Self::AllowList(v)
    }
}

/// Ordered, failure-isolating OR over strategies
///
/// # Example
///
/// ```rust
/// use mcpgate_auth::{AllowListVerifier, CompositeVerifier, IdentityFields, KeyTableVerifier};
///
/// # tokio_test::block_on(async {
/// let verifier = CompositeVerifier::new()
///     .with_strategy(KeyTableVerifier::new(
///         "api-keys",
///         [("mock_mcp_api_key", IdentityFields::new("api-key-client").with_scopes(["user"]))],
///     ))
///     .with_strategy(AllowListVerifier::new(
///         "demo",
///         ["demo-token"],
///         IdentityFields::new("demo-client").with_subject("demo-user"),
///     ));
///
/// let identity = verifier.verify("demo-token").await.unwrap();
/// assert_eq!(identity.client_id(), "demo-client");
/// assert!(verifier.verify("nope").await.is_err());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompositeVerifier {
    strategies: Vec<Strategy>,
    required_scopes: ScopeSet,
}

impl CompositeVerifier {
    /// Empty verifier; rejects everything until strategies are added
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration using the system clock
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any strategy cannot be constructed.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        Self::from_config_with_clock(config, Arc::new(SystemClock))
    }

    /// Build from configuration with an explicit time source
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any strategy cannot be constructed.
    pub fn from_config_with_clock(
        config: &VerifierConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let strategies = config
            .strategies
            .iter()
            .map(|s| Strategy::from_config(s, config.key_fetch_timeout, Arc::clone(&clock)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            strategies,
            required_scopes: config.required_scopes.clone(),
        })
    }

    /// Append a strategy (tried after those already present)
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<Strategy>) -> Self {
        self.strategies.push(strategy.into());
        self
    }

    /// Require every accepted identity to hold these scopes
    #[must_use]
    pub fn with_required_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Strategies in evaluation order
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Aggregate required scopes
    pub fn required_scopes(&self) -> &ScopeSet {
        &self.required_scopes
    }

    /// Verify a raw credential
    ///
    /// # Errors
    ///
    /// [`Rejected`] when no strategy accepts with the aggregate scopes satisfied.
    pub async fn verify(&self, credential: &str) -> Result<Identity, Rejected> {
        let kind = classify(credential);

        for strategy in &self.strategies {
            let outcome = AssertUnwindSafe(strategy.verify(credential))
                .catch_unwind()
                .await;

            let identity = match outcome {
                Ok(Ok(identity)) => identity,
                Ok(Err(reason)) => {
                    debug!(
                        strategy = %strategy.name(),
                        method = strategy.method(),
                        %kind,
                        %reason,
                        "Strategy declined credential"
                    );
                    continue;
                }
                Err(_) => {
                    error!(
                        strategy = %strategy.name(),
                        method = strategy.method(),
                        "Strategy panicked; treating as declined"
                    );
                    continue;
                }
            };

            let missing = missing_scopes(identity.scopes(), &self.required_scopes);
            if !missing.is_empty() {
                debug!(
                    strategy = %strategy.name(),
                    method = strategy.method(),
                    missing = ?missing,
                    "Accepted identity lacks aggregate required scopes; trying next strategy"
                );
                continue;
            }

            debug!(
                strategy = %strategy.name(),
                method = strategy.method(),
                client_id = %identity.client_id(),
                "Credential accepted"
            );
            return Ok(identity);
        }

        debug!(%kind, strategies = self.strategies.len(), "Credential rejected");
        Err(Rejected)
    }

    /// Verify the value of an `Authorization` header
    ///
    /// # Errors
    ///
    /// [`Rejected`] if the header is not `Bearer <credential>` or the
    /// credential is rejected.
    pub async fn verify_bearer_credential(&self, header_value: &str) -> Result<Identity, Rejected> {
        let credential = extract_bearer(header_value).ok_or(Rejected)?;
        self.verify(credential).await
    }

    /// Verify, giving up with [`Rejected`] as soon as `cancel` fires
    ///
    /// # Errors
    ///
    /// [`Rejected`] on rejection or cancellation.
    pub async fn verify_with_cancellation(
        &self,
        credential: &str,
        cancel: &CancellationToken,
    ) -> Result<Identity, Rejected> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Verification cancelled");
                Err(Rejected)
            }
            result = self.verify(credential) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IdentityFields, scope_set};

    fn demo_list() -> AllowListVerifier {
        AllowListVerifier::new(
            "demo",
            ["demo-token"],
            IdentityFields::new("demo-client")
                .with_subject("demo-user")
                .with_scopes(["user"]),
        )
    }

    #[tokio::test]
    async fn test_empty_composite_rejects() {
        let verifier = CompositeVerifier::new();
        assert_eq!(verifier.verify("anything").await.unwrap_err(), Rejected);
        assert_eq!(verifier.verify("").await.unwrap_err(), Rejected);
    }

    #[tokio::test]
    async fn test_bearer_header_forms() {
        let verifier = CompositeVerifier::new().with_strategy(demo_list());
        assert!(verifier.verify_bearer_credential("Bearer demo-token").await.is_ok());
        assert!(verifier.verify_bearer_credential("bearer demo-token").await.is_ok());
        assert!(verifier.verify_bearer_credential("demo-token").await.is_err());
        assert!(verifier.verify_bearer_credential("Bearer ").await.is_err());
        assert!(verifier.verify_bearer_credential("Basic demo-token").await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_verification_is_rejected() {
        let verifier = CompositeVerifier::new().with_strategy(demo_list());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            verifier
                .verify_with_cancellation("demo-token", &cancel)
                .await
                .unwrap_err(),
            Rejected
        );

        let live = CancellationToken::new();
        assert!(verifier.verify_with_cancellation("demo-token", &live).await.is_ok());
    }

    #[tokio::test]
    async fn test_aggregate_scopes_fall_through() {
        let narrow = AllowListVerifier::new("narrow", ["shared-token"], IdentityFields::new("narrow"));
        let broad = AllowListVerifier::new(
            "broad",
            ["shared-token"],
            IdentityFields::new("broad").with_scopes(["user"]),
        );
        let verifier = CompositeVerifier::new()
            .with_strategy(narrow)
            .with_strategy(broad)
            .with_required_scopes(["user"]);

        let identity = verifier.verify("shared-token").await.unwrap();
        assert_eq!(identity.client_id(), "broad");
        assert_eq!(identity.scopes(), &scope_set(["user"]));
    }

    #[test]
    fn test_from_config_preserves_order() {
        let config: VerifierConfig = serde_json::from_value(serde_json::json!({
            "strategies": [
                {"type": "allow_list", "name": "b", "tokens": [], "identity": {"client_id": "x"}},
                {"type": "key_table", "name": "a", "keys": {}},
            ]
        }))
        .unwrap();
        let verifier = CompositeVerifier::from_config(&config).unwrap();
        let names: Vec<_> = verifier.strategies().iter().map(Strategy::name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(verifier.strategies()[1].method(), "key_table");
    }
}
