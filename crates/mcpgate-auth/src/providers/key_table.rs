//! Key Table Strategy
//!
//! Opaque API keys for service-to-service callers, each bound to its own
//! identity. Identities carry no expiry.

use std::fmt;

use crate::config::KeyTableConfig;
use crate::error::VerifyError;
use crate::key_validation::DigestTable;
use crate::types::{Identity, IdentityFields};

/// Verifier for a table of opaque keys
#[derive(Clone)]
pub struct KeyTableVerifier {
    /// Strategy name
    name: String,
    /// Key digests with their identities
    keys: DigestTable<IdentityFields>,
}

impl fmt::Debug for KeyTableVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTableVerifier")
            .field("name", &self.name)
            .field("keys", &self.keys.len())
            .finish()
    }
}

impl KeyTableVerifier {
    /// Build from `(key, identity)` pairs
    pub fn new<I, K>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = (K, IdentityFields)>,
        K: AsRef<str>,
    {
        let name = name.into();
        let pairs: Vec<(K, IdentityFields)> = keys.into_iter().collect();
        let keys = DigestTable::new(
            &name,
            pairs.iter().map(|(key, fields)| (key.as_ref(), fields.clone())),
        );
        Self { name, keys }
    }

    /// Build from configuration
    pub fn from_config(config: &KeyTableConfig) -> Self {
        Self::new(config.name.clone(), config.keys.clone())
    }

    /// Strategy name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look the credential up
    ///
    /// # Errors
    ///
    /// [`VerifyError::UnknownCredential`] if the key is not in the table.
    pub fn verify(&self, credential: &str) -> Result<Identity, VerifyError> {
        self.keys
            .find(credential)
            .map(|fields| fields.to_identity(credential))
            .ok_or(VerifyError::UnknownCredential)
    }
}
