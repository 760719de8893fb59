//! Tower Layer implementation for authentication

use std::sync::Arc;
use tower::Layer;

use crate::composite::CompositeVerifier;

use super::AuthLayerConfig;
use super::service::AuthService;

/// Tower Layer that adds authentication to services
///
/// Wraps inner services with [`AuthService`], which verifies the request's
/// credential before forwarding it.
#[derive(Debug, Clone)]
pub struct AuthLayer {
    /// Shared verifier
    verifier: Arc<CompositeVerifier>,
    /// Layer configuration
    config: AuthLayerConfig,
}

impl AuthLayer {
    /// Create a new auth layer with default configuration
    pub fn new(verifier: CompositeVerifier) -> Self {
        Self::from_arc(Arc::new(verifier))
    }

    /// Create a new auth layer from an Arc'd verifier
    pub fn from_arc(verifier: Arc<CompositeVerifier>) -> Self {
        Self {
            verifier,
            config: AuthLayerConfig::default(),
        }
    }

    /// Set the configuration for this layer
    #[must_use]
    pub fn config(mut self, config: AuthLayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a path to bypass authentication
    #[must_use]
    pub fn bypass_path(mut self, path: impl Into<String>) -> Self {
        self.config.bypass_paths.push(path.into());
        self
    }

    /// Current configuration
    pub fn layer_config(&self) -> &AuthLayerConfig {
        &self.config
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService::new(inner, Arc::clone(&self.verifier), self.config.clone())
    }
}
