//! # Tower Middleware Integration
//!
//! Tower Layer and Service implementations that put a [`CompositeVerifier`]
//! in front of any HTTP service.
//!
//! - [`AuthLayer`] - wraps services with authentication
//! - [`AuthService`] - extracts the credential, verifies it, and binds the
//!   resulting identity to the request
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use mcpgate_auth::tower::AuthLayer;
//!
//! let service = ServiceBuilder::new()
//!     .layer(AuthLayer::new(verifier))
//!     .service(my_inner_service);
//! ```
//!
//! ## Request Extensions
//!
//! On success an [`IdentityContext`] bound to the verified identity is
//! inserted into the request's extensions:
//!
//! ```rust,ignore
//! let ctx = req.extensions().get::<IdentityContext>().unwrap();
//! let identity = ctx.current()?;
//! ```
//!
//! [`CompositeVerifier`]: crate::CompositeVerifier
//! [`IdentityContext`]: crate::IdentityContext

mod layer;
mod service;

pub use layer::AuthLayer;
pub use service::{AuthService, AuthServiceFuture};

use crate::server::PROTECTED_RESOURCE_METADATA_PATH;

/// Configuration for the auth layer
#[derive(Debug, Clone)]
pub struct AuthLayerConfig {
    /// Request paths that bypass authentication
    pub bypass_paths: Vec<String>,
    /// Header carrying `Bearer <credential>` (default: "Authorization")
    pub auth_header: String,
    /// Header carrying a raw API key, consulted when the auth header is absent
    pub api_key_header: Option<String>,
    /// Advertised in `WWW-Authenticate` challenges
    pub resource_metadata_url: Option<String>,
}

impl Default for AuthLayerConfig {
    fn default() -> Self {
        Self {
            bypass_paths: vec![
                PROTECTED_RESOURCE_METADATA_PATH.to_string(),
                "/health".to_string(),
            ],
            auth_header: "Authorization".to_string(),
            api_key_header: Some("X-API-Key".to_string()),
            resource_metadata_url: None,
        }
    }
}

impl AuthLayerConfig {
    /// Add a path to the bypass list
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.bypass_paths.push(path.into());
        self
    }

    /// Set the authorization header name
    #[must_use]
    pub fn auth_header(mut self, header: impl Into<String>) -> Self {
        self.auth_header = header.into();
        self
    }

    /// Set the API key header name
    #[must_use]
    pub fn api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = Some(header.into());
        self
    }

    /// Accept credentials only through the authorization header
    #[must_use]
    pub fn without_api_key_header(mut self) -> Self {
        self.api_key_header = None;
        self
    }

    /// Set the metadata URL advertised on 401s
    #[must_use]
    pub fn resource_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.resource_metadata_url = Some(url.into());
        self
    }

    /// Check if a path should bypass authentication
    #[must_use]
    pub fn should_bypass(&self, path: &str) -> bool {
        self.bypass_paths.iter().any(|p| p == path)
    }
}
