//! Allow-list strategy: a set of opaque tokens that all map to one identity.

use std::fmt;

use crate::config::AllowListConfig;
use crate::error::VerifyError;
use crate::key_validation::DigestTable;
use crate::types::{Identity, IdentityFields};

/// Verifier for a shared-identity token list
#[derive(Clone)]
pub struct AllowListVerifier {
    name: String,
    tokens: DigestTable<()>,
    identity: IdentityFields,
}

impl fmt::Debug for AllowListVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowListVerifier")
            .field("name", &self.name)
            .field("tokens", &self.tokens.len())
            .field("identity", &self.identity)
            .finish()
    }
}

impl AllowListVerifier {
    /// Build from a token list and the identity they share
    pub fn new<I, T>(name: impl Into<String>, tokens: I, identity: IdentityFields) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let name = name.into();
        let tokens: Vec<T> = tokens.into_iter().collect();
        let tokens = DigestTable::new(&name, tokens.iter().map(|t| (t.as_ref(), ())));
        Self {
            name,
            tokens,
            identity,
        }
    }

    /// Build from configuration
    pub fn from_config(config: &AllowListConfig) -> Self {
        Self::new(
            config.name.clone(),
            &config.tokens,
            config.identity.clone(),
        )
    }

    /// Strategy name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check membership
    ///
    /// # Errors
    ///
    /// [`VerifyError::UnknownCredential`] if the token is not listed.
    pub fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        self.tokens
            .find(credential)
            .map(|()| self.identity.to_identity(credential))
            .ok_or(VerifyError::UnknownCredential)
    }
}
