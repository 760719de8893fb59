//! Request-scoped identity context
//!
//! Exactly one [`IdentityContext`] exists per request. The transport layer
//! creates it, binds the verified [`Identity`] once, and hands it to tool
//! handlers, which read it back with [`IdentityContext::current`] or gate on
//! [`IdentityContext::require_scopes`].
//!
//! Clones share the same binding, so a clone is the same request seen from
//! another task. Two requests never share a context because nothing is
//! global: contexts travel with the request (for HTTP, in its extensions).
//!
//! ```rust
//! use mcpgate_auth::{ContextError, IdentityContext};
//!
//! let ctx = IdentityContext::new();
//! assert_eq!(ctx.current().unwrap_err(), ContextError::Unbound);
//! ```

use std::sync::{Arc, OnceLock};

use uuid::Uuid;

use crate::error::{AuthError, ContextError, Rejected};
use crate::scope;
use crate::types::{Identity, ScopeSet};

/// Per-request holder for the verified identity
#[derive(Debug, Clone)]
pub struct IdentityContext {
    /// Unique request identifier, for log correlation
    request_id: Arc<str>,
    /// Set at most once
    identity: Arc<OnceLock<Identity>>,
}

impl Default for IdentityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityContext {
    /// Create an empty context with a generated request id
    pub fn new() -> Self {
        Self::with_request_id(Uuid::new_v4().to_string())
    }

    /// Create an empty context with a caller-supplied request id
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            identity: Arc::new(OnceLock::new()),
        }
    }

    /// Create a context that already carries `identity`
    pub fn bound(identity: Identity) -> Self {
        let ctx = Self::new();
        // A fresh OnceLock cannot already be set.
        let _ = ctx.identity.set(identity);
        ctx
    }

    /// Request identifier
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Bind the verified identity for this request
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::AlreadyBound`] if an identity was bound before.
    pub fn bind(&self, identity: Identity) -> Result<(), ContextError> {
        self.identity
            .set(identity)
            .map_err(|_| ContextError::AlreadyBound)
    }

    /// The identity bound to this request
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Unbound`] if nothing has been bound.
    pub fn current(&self) -> Result<&Identity, ContextError> {
        self.identity.get().ok_or(ContextError::Unbound)
    }

    /// Whether an identity has been bound
    pub fn is_bound(&self) -> bool {
        self.identity.get().is_some()
    }

    /// The bound identity, if it holds every scope in `required`
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] when nothing is bound, otherwise
    /// [`AuthError::Forbidden`] listing the missing scopes.
    pub fn require_scopes(&self, required: &ScopeSet) -> Result<&Identity, AuthError> {
        let identity = self
            .current()
            .map_err(|_| AuthError::Unauthenticated(Rejected))?;
        Ok(scope::require_scopes(identity, required)?)
    }
}
