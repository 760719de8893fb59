//! Structured token infrastructure
//!
//! - `jwks` - key-set fetching and caching
//! - `key_source` - turns configuration into verification keys
//! - `validator` - the claims strategy ([`ClaimsVerifier`])
//!
//! [`ClaimSet`] is the decoded payload. Claim names are configurable per
//! trust anchor, so claims are kept as a JSON object and read by name rather
//! than deserialized into a fixed struct.

pub mod jwks;
pub mod key_source;
pub mod validator;

pub use jwks::JwksClient;
pub use key_source::KeySource;
pub use validator::ClaimsVerifier;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};

use crate::error::VerifyError;

/// Decoded token payload (RFC 7519 claims plus whatever the issuer adds)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    /// Wrap an already decoded payload
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Read the payload without checking the signature
    ///
    /// The token must have three segments, and both the header and payload
    /// must be base64url-encoded JSON objects.
    ///
    /// # Errors
    ///
    /// [`VerifyError::Malformed`] for anything else.
    pub fn decode_unverified(token: &str) -> Result<Self, VerifyError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VerifyError::Malformed);
        };

        decode_segment(header)?;
        decode_segment(payload).map(Self)
    }

    /// Raw claim value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String claim; non-string values read as absent
    pub fn string(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// NumericDate claim (RFC 7519 section 2)
    ///
    /// Fractional seconds are truncated.
    ///
    /// # Errors
    ///
    /// [`VerifyError::Malformed`] if the claim is present but not a
    /// non-negative number that fits in a `u64`.
    pub fn timestamp(&self, name: &str) -> Result<Option<u64>, VerifyError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(float_seconds))
                .map(Some)
                .ok_or(VerifyError::Malformed),
            Some(_) => Err(VerifyError::Malformed),
        }
    }

    /// NumericDate claim as a point in time
    ///
    /// # Errors
    ///
    /// [`VerifyError::Malformed`] under the same conditions as
    /// [`timestamp`](Self::timestamp), or when the value lies beyond what
    /// `SystemTime` can represent.
    pub fn time(&self, name: &str) -> Result<Option<SystemTime>, VerifyError> {
        self.timestamp(name)?
            .map(|secs| {
                UNIX_EPOCH
                    .checked_add(Duration::from_secs(secs))
                    .ok_or(VerifyError::Malformed)
            })
            .transpose()
    }

    /// Whether the `aud` claim (string or array) contains `audience`
    pub fn audience_contains(&self, audience: &str) -> bool {
        match self.0.get("aud") {
            Some(Value::String(aud)) => aud == audience,
            Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(audience)),
            _ => false,
        }
    }
}

// 2^64 as f64; anything at or above it does not fit in a u64
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn float_seconds(f: f64) -> Option<u64> {
    (f.is_finite() && (0.0..U64_LIMIT).contains(&f)).then(|| f.trunc() as u64)
}

fn decode_segment(segment: &str) -> Result<Map<String, Value>, VerifyError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|_| VerifyError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| VerifyError::Malformed)
}
