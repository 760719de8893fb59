//! # MCPGate Auth - Multi-Method Bearer Credential Verification
//!
//! Verifies bearer credentials presented to a resource server and turns them
//! into a normalized [`Identity`] carrying a client id, an optional subject,
//! a set of local scopes, and an optional expiry.
//!
//! ## Design Principles
//!
//! - **One answer for callers**: a credential is accepted or [`Rejected`];
//!   the reason only ever reaches the logs
//! - **Ordered OR**: strategies are tried in configured order and the first
//!   acceptance wins
//! - **Failure isolation**: a strategy that errors, times out, or panics just
//!   declines
//! - **Local scopes only**: foreign scopes are translated before anything
//!   downstream sees them
//!
//! ## Architecture
//!
//! - [`classify`] - Structured vs. opaque credential shape
//! - [`jwt`] - Claims strategy: signature, issuer, audience, time, scopes
//! - [`providers`] - Key table and allow-list strategies
//! - [`composite`] - Ordered, failure-isolating OR over strategies
//! - [`scope`] - Scope translation and enforcement
//! - [`context`] - Request-scoped identity binding
//! - [`config`] - Declarative strategy configuration
//! - [`server`] - RFC 9728 metadata and `WWW-Authenticate` helpers
//! - `tower` - Tower middleware (feature `middleware`)
//!
//! ## Quick Start
//!
//! ```rust
//! use mcpgate_auth::{
//!     AllowListVerifier, CompositeVerifier, IdentityContext, IdentityFields, scope_set,
//! };
//!
//! # tokio_test::block_on(async {
//! let verifier = CompositeVerifier::new().with_strategy(AllowListVerifier::new(
//!     "demo",
//!     ["demo-token"],
//!     IdentityFields::new("demo-client").with_scopes(["user", "weather:read"]),
//! ));
//!
//! let identity = verifier.verify_bearer_credential("Bearer demo-token").await.unwrap();
//! let ctx = IdentityContext::bound(identity);
//!
//! assert!(ctx.require_scopes(&scope_set(["weather:read"])).is_ok());
//! assert!(ctx.require_scopes(&scope_set(["weather:forecast"])).is_err());
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - `middleware` (default) - Tower [`Layer`](::tower::Layer) and service
//!
//! ## Standards Compliance
//!
//! - **RFC 7519** - JSON Web Token (JWT)
//! - **RFC 7517** - JSON Web Key (JWK) sets
//! - **RFC 6750** - Bearer token usage and error codes
//! - **RFC 9728** - OAuth 2.0 Protected Resource Metadata

// Submodules
pub mod classify;
pub mod clock;
pub mod composite;
pub mod config;
pub mod context;
pub mod error;
pub mod jwt;
pub mod key_validation;
pub mod providers;
pub mod scope;
pub mod server;
pub mod types;

#[cfg(feature = "middleware")]
pub mod tower;

#[doc(inline)]
pub use classify::{CredentialKind, classify};

#[doc(inline)]
pub use clock::{Clock, FixedClock, SystemClock};

#[doc(inline)]
pub use composite::{CompositeVerifier, Strategy};

// Re-export configuration types
#[doc(inline)]
pub use config::{
    AllowListConfig, ClaimNames, KeySourceConfig, KeyTableConfig, SignaturePolicy,
    StrategyConfig, TrustAnchor, VerifierConfig,
};

#[doc(inline)]
pub use context::IdentityContext;

#[doc(inline)]
pub use error::{AuthError, ConfigError, ContextError, Forbidden, Rejected, VerifyError};

#[doc(inline)]
pub use jwt::ClaimsVerifier;

#[doc(inline)]
pub use providers::{AllowListVerifier, KeyTableVerifier};

#[doc(inline)]
pub use scope::{BASELINE_SCOPE, ScopeMapping, missing_scopes, require_scopes, translate};

#[doc(inline)]
pub use types::{Identity, IdentityFields, ScopeSet, scope_set};
