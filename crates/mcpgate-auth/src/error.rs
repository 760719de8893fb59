//! Error types for credential verification, scope enforcement and configuration.
//!
//! The split mirrors who gets to see what:
//!
//! - [`VerifyError`] is a strategy-level reason. It is logged at debug level and
//!   never leaves the [`CompositeVerifier`](crate::CompositeVerifier).
//! - [`Rejected`] is the only thing a caller learns when no strategy accepts.
//! - [`Forbidden`] means the principal is known but lacks scopes.
//! - [`AuthError`] folds the last two together for transports (401 vs 403).

use std::collections::BTreeSet;

use http::StatusCode;
use thiserror::Error;

/// Reason a single strategy declined a credential
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Not a structurally valid credential for this strategy
    #[error("Malformed credential")]
    Malformed,

    /// `exp` is at or before the current time
    #[error("Credential expired")]
    Expired,

    /// `nbf` is in the future
    #[error("Credential not yet valid")]
    NotYetValid,

    /// Issuer claim absent or not the configured one
    #[error("Untrusted issuer")]
    UntrustedIssuer,

    /// Audience claim absent or does not contain the configured one
    #[error("Untrusted audience")]
    UntrustedAudience,

    /// A claim the strategy needs to build an identity is missing
    #[error("Missing required claim: {0}")]
    MissingRequiredClaim(String),

    /// Static tables: the credential is not listed
    #[error("Unknown credential")]
    UnknownCredential,

    /// The key set could not be obtained (network, timeout, unknown key id)
    #[error("Key source unavailable: {0}")]
    KeySourceUnavailable(String),

    /// Signature did not verify against the resolved key
    #[error("Invalid signature")]
    InvalidSignature,

    /// The trust anchor's own required scopes are not all granted
    #[error("Credential lacks scopes required by its trust anchor")]
    InsufficientScope,
}

/// Opaque authentication failure returned by the composite verifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("Authentication required")]
pub struct Rejected;

/// Authenticated principal without the required scopes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Insufficient scope: missing {}", join_scopes(.missing))]
pub struct Forbidden {
    /// Required scopes the identity does not hold
    pub missing: BTreeSet<String>,
}

impl Forbidden {
    /// Space-separated list of the missing scopes, as used in `WWW-Authenticate`
    pub fn missing_scope_string(&self) -> String {
        join_scopes(&self.missing)
    }
}

fn join_scopes(scopes: &BTreeSet<String>) -> String {
    scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Transport-facing authentication or authorization failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No identity could be established
    #[error(transparent)]
    Unauthenticated(#[from] Rejected),

    /// Identity established but missing scopes
    #[error(transparent)]
    Forbidden(#[from] Forbidden),
}

impl AuthError {
    /// HTTP status for this failure (401 or 403)
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// OAuth 2.0 bearer token error code (RFC 6750 section 3.1)
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "invalid_token",
            Self::Forbidden(_) => "insufficient_scope",
        }
    }
}

/// Misuse of the request-scoped [`IdentityContext`](crate::IdentityContext)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// Nothing has been bound for this request
    #[error("No identity bound to this request")]
    Unbound,

    /// An identity was already bound for this request
    #[error("An identity is already bound to this request")]
    AlreadyBound,
}

/// Invalid verifier configuration, detected at construction time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds a value the verifier cannot work with
    #[error("Invalid configuration for {strategy}: {reason}")]
    Invalid {
        /// Strategy or section name
        strategy: String,
        /// What is wrong
        reason: String,
    },

    /// Key material could not be parsed
    #[error("Invalid key material for {strategy}: {reason}")]
    KeyMaterial {
        /// Strategy name
        strategy: String,
        /// Parser message
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(strategy: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            AuthError::from(Rejected).status_code(),
            StatusCode::UNAUTHORIZED
        );
        let forbidden = Forbidden {
            missing: BTreeSet::from(["weather:read".to_string()]),
        };
        assert_eq!(
            AuthError::from(forbidden).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_forbidden_lists_missing_scopes() {
        let forbidden = Forbidden {
            missing: BTreeSet::from(["b".to_string(), "a".to_string()]),
        };
        assert_eq!(forbidden.missing_scope_string(), "a b");
        assert_eq!(forbidden.to_string(), "Insufficient scope: missing a b");
    }

    #[test]
    fn test_rejected_message_is_opaque() {
        assert_eq!(Rejected.to_string(), "Authentication required");
    }
}
