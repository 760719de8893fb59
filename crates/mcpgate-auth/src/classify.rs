//! Credential shape classification
//!
//! A cheap structural test, no decoding. The claims strategy uses it to skip
//! parsing strings that cannot be a signed token; the composite verifier logs
//! it. It never decides which strategies run.

use std::fmt;

/// Structural kind of a bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Exactly three non-empty dot-separated segments
    StructuredToken,
    /// Anything else
    Opaque,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructuredToken => f.write_str("structured"),
            Self::Opaque => f.write_str("opaque"),
        }
    }
}

/// Classify a raw credential by shape
pub fn classify(credential: &str) -> CredentialKind {
    let mut segments = credential.split('.');
    let three_filled = (0..3).all(|_| segments.next().is_some_and(|s| !s.is_empty()));

    if three_filled && segments.next().is_none() {
        CredentialKind::StructuredToken
    } else {
        CredentialKind::Opaque
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_three_segments_are_structured() {
        assert_eq!(classify("aaa.bbb.ccc"), CredentialKind::StructuredToken);
        assert_eq!(
            classify("eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJ4In0.c2ln"),
            CredentialKind::StructuredToken
        );
    }

    #[test]
    fn test_opaque_shapes() {
        for credential in [
            "",
            "demo-token",
            "mock_mcp_api_key",
            "a.b",
            "a.b.c.d",
            "a..c",
            ".b.c",
            "a.b.",
            "..",
        ] {
            assert_eq!(
                classify(credential),
                CredentialKind::Opaque,
                "credential {credential:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn test_strings_without_dots_are_opaque(s in "[^.]*") {
            prop_assert_eq!(classify(&s), CredentialKind::Opaque);
        }

        #[test]
        fn test_joined_non_empty_segments_are_structured(
            a in "[^.]{1,16}",
            b in "[^.]{1,16}",
            c in "[^.]{1,16}",
        ) {
            let credential = format!("{a}.{b}.{c}");
            prop_assert_eq!(classify(&credential), CredentialKind::StructuredToken);
        }
    }
}
