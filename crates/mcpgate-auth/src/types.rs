//! Core Identity Types
//!
//! [`Identity`] is what every verification strategy produces. Its fields are
//! crate-private so an identity can only come out of a strategy, never be
//! assembled by a tool handler.

use std::collections::BTreeSet;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Scope names granted to or required of a principal
pub type ScopeSet = BTreeSet<String>;

/// Build a [`ScopeSet`] from anything iterable of string-likes
pub fn scope_set<I, S>(scopes: I) -> ScopeSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scopes.into_iter().map(Into::into).collect()
}

/// A verified principal
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Human or service subject, absent for credentials without one
    pub(crate) subject: Option<String>,
    /// Calling application
    pub(crate) client_id: String,
    /// Granted scopes in the local vocabulary
    pub(crate) scopes: ScopeSet,
    /// Expiry taken from the credential, if it carried one
    pub(crate) expires_at: Option<SystemTime>,
    /// The original credential
    pub(crate) token: String,
}

impl Identity {
    pub(crate) fn new(
        token: impl Into<String>,
        client_id: impl Into<String>,
        subject: Option<String>,
        scopes: ScopeSet,
        expires_at: Option<SystemTime>,
    ) -> Self {
        Self {
            subject,
            client_id: client_id.into(),
            scopes,
            expires_at,
            token: token.into(),
        }
    }

    /// Get the subject
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Get the client identifier
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Get the granted scopes
    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// Get the expiration time
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    /// Get the original credential
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &self.subject)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// The identity a static credential table hands out
///
/// Static tables bind identities in configuration; the token is attached when
/// a presented credential matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFields {
    /// Client identifier
    pub client_id: String,
    /// Optional subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Granted scopes (local vocabulary)
    #[serde(default)]
    pub scopes: ScopeSet,
}

impl IdentityFields {
    /// Create fields for a client with no subject and no scopes
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            subject: None,
            scopes: ScopeSet::new(),
        }
    }

    /// Set the subject
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the granted scopes
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scope_set(scopes);
        self
    }

    pub(crate) fn to_identity(&self, token: &str) -> Identity {
        Identity::new(
            token,
            self.client_id.clone(),
            self.subject.clone(),
            self.scopes.clone(),
            None,
        )
    }
}
