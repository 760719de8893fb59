//! Constant-time matching for static credentials
//!
//! Static tables never compare raw strings. Every configured credential is
//! reduced to a BLAKE3 digest at construction, the presented credential is
//! digested once per lookup, and digests are compared with
//! `subtle::ConstantTimeEq`. The scan visits every entry even after a match,
//! so lookup time depends on table size only.
//!
//! Credentials shorter than [`MIN_RECOMMENDED_KEY_LENGTH`] are still accepted
//! (demo deployments use short tokens) but produce a warning at startup.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use tracing::warn;

/// Length below which a static credential is considered weak
pub const MIN_RECOMMENDED_KEY_LENGTH: usize = 32;

/// Fixed-size digest of a credential
pub(crate) type CredentialDigest = [u8; 32];

#[inline]
pub(crate) fn digest(credential: &str) -> CredentialDigest {
    blake3::hash(credential.as_bytes()).into()
}

/// Compare two credentials in constant time
///
/// ```rust
/// use mcpgate_auth::key_validation::credentials_match;
///
/// assert!(credentials_match("mock_mcp_api_key", "mock_mcp_api_key"));
/// assert!(!credentials_match("mock_mcp_api_kez", "mock_mcp_api_key"));
/// ```
#[must_use]
#[inline]
pub fn credentials_match(provided: &str, expected: &str) -> bool {
    digest(provided).ct_eq(&digest(expected)).into()
}

/// Digests of configured credentials, each tagged with a payload
#[derive(Clone)]
pub(crate) struct DigestTable<T> {
    entries: Vec<(CredentialDigest, T)>,
}

impl<T> DigestTable<T> {
    pub(crate) fn new<'a, I>(strategy: &str, credentials: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, T)>,
    {
        let mut short = 0usize;
        let entries: Vec<_> = credentials
            .into_iter()
            .map(|(credential, payload)| {
                if credential.len() < MIN_RECOMMENDED_KEY_LENGTH {
                    short += 1;
                }
                (digest(credential), payload)
            })
            .collect();

        if short > 0 {
            warn!(
                strategy,
                short_credentials = short,
                min_length = MIN_RECOMMENDED_KEY_LENGTH,
                "Static credentials shorter than recommended; use only for development"
            );
        }

        Self { entries }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Payload of the entry matching `credential`, scanning the whole table
    pub(crate) fn find(&self, credential: &str) -> Option<&T> {
        let presented = digest(credential);
        let mut found = Choice::from(0);
        let mut index = 0u64;

        for (i, (candidate, _)) in self.entries.iter().enumerate() {
            let hit = candidate.ct_eq(&presented);
            // Keep the first hit; later hits leave `index` alone.
            let take = hit & !found;
            index.conditional_assign(&(i as u64), take);
            found |= hit;
        }

        if bool::from(found) {
            self.entries.get(index as usize).map(|(_, payload)| payload)
        } else {
            None
        }
    }
}
