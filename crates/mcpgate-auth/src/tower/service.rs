//! Tower Service implementation for authentication
//!
//! [`AuthService`] handles `http::Request<B>`:
//! - Requests to a bypass path are forwarded untouched
//! - The credential comes from `Authorization: Bearer <credential>`, or from
//!   the API key header when no authorization header is sent
//! - Verified requests get an [`IdentityContext`] in their extensions
//! - Everything else is answered with a 401 and a `WWW-Authenticate` challenge
//!   without reaching the inner service

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower_service::Service;
use tracing::debug;

use crate::composite::CompositeVerifier;
use crate::context::IdentityContext;
use crate::error::{AuthError, Rejected};
use crate::server::{auth_error_response, extract_bearer};

use super::AuthLayerConfig;

/// Tower Service that performs authentication
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    inner: S,
    verifier: Arc<CompositeVerifier>,
    config: AuthLayerConfig,
}

impl<S> AuthService<S> {
    /// Create a new auth service
    pub fn new(inner: S, verifier: Arc<CompositeVerifier>, config: AuthLayerConfig) -> Self {
        Self {
            inner,
            verifier,
            config,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Pull the credential out of the request headers
    ///
    /// A present but malformed authorization header yields `None`; the API
    /// key header is only consulted when the authorization header is absent.
    fn extract_credential(&self, headers: &http::HeaderMap) -> Option<String> {
        if let Some(value) = headers.get(self.config.auth_header.as_str()) {
            let value = value.to_str().ok()?;
            return extract_bearer(value).map(str::to_owned);
        }

        let name = self.config.api_key_header.as_deref()?;
        let value = headers.get(name)?.to_str().ok()?.trim();
        (!value.is_empty()).then(|| value.to_owned())
    }
}

/// Future type for auth service responses
pub type AuthServiceFuture<T, E> = BoxFuture<'static, Result<T, E>>;

impl<S, B, ResBody> Service<http::Request<B>> for AuthService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = AuthServiceFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if self.config.should_bypass(req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let credential = self.extract_credential(req.headers());
        let verifier = Arc::clone(&self.verifier);
        let metadata_url = self.config.resource_metadata_url.clone();

        Box::pin(async move {
            let verified = match credential {
                Some(credential) => verifier.verify(&credential).await,
                None => {
                    debug!(path = %req.uri().path(), "No credential presented");
                    Err(Rejected)
                }
            };

            match verified {
                Ok(identity) => {
                    req.extensions_mut().insert(IdentityContext::bound(identity));
                    inner.call(req).await
                }
                Err(rejected) => Ok(auth_error_response(
                    &AuthError::from(rejected),
                    metadata_url.as_deref(),
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{AllowListVerifier, KeyTableVerifier};
    use crate::tower::AuthLayer;
    use crate::types::IdentityFields;
    use http::{Request, Response, StatusCode, header};
    use std::convert::Infallible;
    use tower::{Layer, ServiceExt, service_fn};

    fn verifier() -> CompositeVerifier {
        CompositeVerifier::new()
            .with_strategy(KeyTableVerifier::new(
                "api-keys",
                [(
                    "mock_mcp_api_key",
                    IdentityFields::new("api-key-client").with_scopes(["user"]),
                )],
            ))
            .with_strategy(AllowListVerifier::new(
                "demo",
                ["demo-token"],
                IdentityFields::new("demo-client").with_subject("demo-user"),
            ))
    }

    /// Echoes the bound client id, or "anonymous"
    async fn echo(req: Request<String>) -> Result<Response<String>, Infallible> {
        let who = req
            .extensions()
            .get::<IdentityContext>()
            .and_then(|ctx| ctx.current().ok())
            .map_or_else(|| "anonymous".to_string(), |id| id.client_id().to_string());
        Ok(Response::new(who))
    }

    fn request(path: &str, headers: &[(&str, &str)]) -> Request<String> {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(String::new()).unwrap()
    }

    #[tokio::test]
    async fn test_bearer_credential_binds_identity() {
        let service = AuthLayer::new(verifier()).layer(service_fn(echo));
        let response = service
            .oneshot(request("/mcp", &[("authorization", "Bearer demo-token")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "demo-client");
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let service = AuthLayer::new(verifier()).layer(service_fn(echo));
        let response = service
            .oneshot(request("/mcp", &[("x-api-key", "mock_mcp_api_key")]))
            .await
            .unwrap();
        assert_eq!(response.body(), "api-key-client");
    }

    #[tokio::test]
    async fn test_malformed_authorization_does_not_fall_back() {
        let service = AuthLayer::new(verifier()).layer(service_fn(echo));
        let response = service
            .oneshot(request(
                "/mcp",
                &[
                    ("authorization", "Basic Zm9vOmJhcg=="),
                    ("x-api-key", "mock_mcp_api_key"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_and_wrong_credentials_get_same_401() {
        let layer = AuthLayer::new(verifier()).config(
            AuthLayerConfig::default()
                .resource_metadata_url("http://localhost:3001/.well-known/oauth-protected-resource"),
        );

        let missing = layer
            .layer(service_fn(echo))
            .oneshot(request("/mcp", &[]))
            .await
            .unwrap();
        let wrong = layer
            .layer(service_fn(echo))
            .oneshot(request("/mcp", &[("authorization", "Bearer nope")]))
            .await
            .unwrap();

        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(missing.body(), wrong.body());
        assert_eq!(
            missing.headers()[header::WWW_AUTHENTICATE],
            wrong.headers()[header::WWW_AUTHENTICATE]
        );
    }

    #[tokio::test]
    async fn test_bypass_path_skips_verification() {
        let service = AuthLayer::new(verifier()).layer(service_fn(echo));
        let response = service
            .oneshot(request("/.well-known/oauth-protected-resource", &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "anonymous");
    }
}
