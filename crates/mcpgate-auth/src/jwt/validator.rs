//! Claims strategy: signed structured tokens checked against a trust anchor
//!
//! Verification order:
//!
//! 1. shape (opaque strings are declined without parsing)
//! 2. signature, unless the anchor is decode-only
//! 3. issuer, then audience, when configured
//! 4. `exp` must be strictly after now (plus leeway); `nbf` must not be in the
//!    future; either claim beyond the representable time range is malformed
//! 5. subject must be present
//! 6. scopes: first configured scope claim, else the anchor defaults; the
//!    anchor's required scopes are checked on these raw values, then the set
//!    is translated if the anchor has a mapping
//!
//! `jsonwebtoken` only checks the signature here. Every time-based check goes
//! through the injected [`Clock`] so the boundaries are testable.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::{Validation, decode, decode_header, errors::ErrorKind};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ClaimSet, KeySource};
use crate::classify::{CredentialKind, classify};
use crate::clock::{Clock, SystemClock};
use crate::config::{SignaturePolicy, TrustAnchor};
use crate::error::{ConfigError, VerifyError};
use crate::scope::{parse_scope_claim, translate};
use crate::types::{Identity, ScopeSet};

/// Client id used when no configured client-id claim is present
pub const UNKNOWN_CLIENT_ID: &str = "unknown";

/// Verifies structured tokens issued under one trust anchor
#[derive(Debug, Clone)]
pub struct ClaimsVerifier {
    anchor: TrustAnchor,
    key_source: KeySource,
    key_fetch_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl ClaimsVerifier {
    /// Build a verifier for `anchor`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when signature verification is on but the anchor
    /// has no usable key source, or lists no algorithms.
    pub fn new(anchor: TrustAnchor, key_fetch_timeout: Duration) -> Result<Self, ConfigError> {
        let key_source = KeySource::from_config(&anchor.name, &anchor.key_source, key_fetch_timeout)?;

        match anchor.signature {
            SignaturePolicy::Verify if key_source.is_none() => {
                return Err(ConfigError::invalid(
                    &anchor.name,
                    "signature verification requires a key source",
                ));
            }
            SignaturePolicy::Verify if anchor.algorithms.is_empty() => {
                return Err(ConfigError::invalid(&anchor.name, "no signing algorithms allowed"));
            }
            SignaturePolicy::DecodeOnly => {
                warn!(
                    strategy = %anchor.name,
                    "Signature verification disabled; tokens are trusted on their claims alone. Do not use in production"
                );
            }
            SignaturePolicy::Verify => {}
        }

        Ok(Self {
            anchor,
            key_source,
            key_fetch_timeout,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Strategy name
    pub fn name(&self) -> &str {
        &self.anchor.name
    }

    /// The trust anchor this verifier enforces
    pub fn anchor(&self) -> &TrustAnchor {
        &self.anchor
    }

    /// Verify `credential` and build its identity
    ///
    /// # Errors
    ///
    /// The [`VerifyError`] for the first check that fails, in the order
    /// documented at module level.
    pub async fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        if classify(credential) == CredentialKind::Opaque {
            return Err(VerifyError::Malformed);
        }

        let claims = match self.anchor.signature {
            SignaturePolicy::Verify => self.decode_verified(credential).await?,
            SignaturePolicy::DecodeOnly => ClaimSet::decode_unverified(credential)?,
        };

        self.check_trust(&claims)?;
        let expires_at = self.check_time(&claims)?;
        self.build_identity(credential, &claims, expires_at)
    }

    async fn decode_verified(&self, credential: &str) -> Result<ClaimSet, VerifyError> {
        let header = decode_header(credential).map_err(|e| {
            debug!(strategy = %self.anchor.name, error = %e, "Failed to decode token header");
            VerifyError::Malformed
        })?;

        if !self.anchor.algorithms.contains(&header.alg) {
            debug!(
                strategy = %self.anchor.name,
                algorithm = ?header.alg,
                allowed = ?self.anchor.algorithms,
                "Token algorithm not allowed"
            );
            return Err(VerifyError::InvalidSignature);
        }

        let key = tokio::time::timeout(
            self.key_fetch_timeout,
            self.key_source.resolve(header.kid.as_deref()),
        )
        .await
        .map_err(|_| {
            warn!(
                strategy = %self.anchor.name,
                timeout_ms = self.key_fetch_timeout.as_millis(),
                "Key resolution timed out"
            );
            VerifyError::KeySourceUnavailable("key fetch timed out".to_string())
        })??;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Map<String, Value>>(credential, &key, &validation).map_err(|e| {
            debug!(strategy = %self.anchor.name, error = %e, "Token signature check failed");
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    VerifyError::InvalidSignature
                }
                _ => VerifyError::Malformed,
            }
        })?;

        Ok(ClaimSet::new(data.claims))
    }

    fn check_trust(&self, claims: &ClaimSet) -> Result<(), VerifyError> {
        if let Some(issuer) = &self.anchor.issuer
            && claims.string("iss") != Some(issuer.as_str())
        {
            return Err(VerifyError::UntrustedIssuer);
        }

        if let Some(audience) = &self.anchor.audience
            && !claims.audience_contains(audience)
        {
            return Err(VerifyError::UntrustedAudience);
        }

        Ok(())
    }

    /// Returns the expiry, if the token has one
    ///
    /// An `exp` or `nbf` too large to represent as a point in time makes the
    /// token malformed rather than effectively non-expiring.
    fn check_time(&self, claims: &ClaimSet) -> Result<Option<SystemTime>, VerifyError> {
        let now = self.clock.now();
        let leeway = self.anchor.leeway;

        let exp = claims.time("exp")?;
        if let Some(exp) = exp
            && exp.checked_add(leeway).is_some_and(|latest| latest <= now)
        {
            return Err(VerifyError::Expired);
        }

        if let Some(nbf) = claims.time("nbf")?
            && now.checked_add(leeway).is_some_and(|latest| nbf > latest)
        {
            return Err(VerifyError::NotYetValid);
        }

        Ok(exp)
    }

    fn build_identity(
        &self,
        credential: &str,
        claims: &ClaimSet,
        expires_at: Option<SystemTime>,
    ) -> Result<Identity, VerifyError> {
        let names = &self.anchor.claims;

        let subject = claims
            .string(&names.subject)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| VerifyError::MissingRequiredClaim(names.subject.clone()))?;

        let client_id = names
            .client_id
            .iter()
            .find_map(|name| claims.string(name).filter(|s| !s.is_empty()))
            .unwrap_or(UNKNOWN_CLIENT_ID);

        let raw_scopes: ScopeSet = names
            .scope
            .iter()
            .find_map(|name| claims.get(name).and_then(parse_scope_claim))
            .unwrap_or_else(|| self.anchor.default_scopes.clone());

        if !self.anchor.required_scopes.is_subset(&raw_scopes) {
            debug!(
                strategy = %self.anchor.name,
                required = ?self.anchor.required_scopes,
                granted = ?raw_scopes,
                "Token lacks scopes required by trust anchor"
            );
            return Err(VerifyError::InsufficientScope);
        }

        let scopes = match &self.anchor.scope_translation {
            Some(mapping) => translate(&raw_scopes, mapping),
            None => raw_scopes,
        };

        Ok(Identity::new(
            credential,
            client_id,
            Some(subject.to_string()),
            scopes,
            expires_at,
        ))
    }
}
