//! Server-side authentication and authorization helpers
//!
//! This module provides utilities for resource servers to handle:
//! - Protected Resource Metadata discovery (RFC 9728)
//! - WWW-Authenticate header generation for 401 and 403 responses
//! - Bearer credential extraction from the `Authorization` header
//! - Uniform JSON bodies for authentication and authorization failures

use http::{HeaderValue, Response, header};
use serde_json::{Value, json};

use crate::error::{AuthError, Forbidden};
use crate::types::ScopeSet;

/// Well-known path of the Protected Resource Metadata document
pub const PROTECTED_RESOURCE_METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

/// Protected Resource Metadata builder (RFC 9728 section 2)
#[derive(Debug, Clone)]
pub struct ProtectedResourceMetadataBuilder {
    /// Resource identifier
    resource: String,
    /// Authorization servers that issue accepted tokens
    authorization_servers: Vec<String>,
    /// Supported scopes
    scopes: ScopeSet,
    /// Resource documentation
    documentation_uri: Option<String>,
}

impl ProtectedResourceMetadataBuilder {
    /// Create a new metadata builder
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            authorization_servers: Vec::new(),
            scopes: ScopeSet::new(),
            documentation_uri: None,
        }
    }

    /// Add an authorization server
    #[must_use]
    pub fn with_authorization_server(mut self, issuer: impl Into<String>) -> Self {
        self.authorization_servers.push(issuer.into());
        self
    }

    /// Set supported scopes
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set documentation URI
    #[must_use]
    pub fn with_documentation(mut self, uri: impl Into<String>) -> Self {
        self.documentation_uri = Some(uri.into());
        self
    }

    /// Build the metadata as JSON value
    pub fn build(self) -> Value {
        let mut metadata = json!({
            "resource": self.resource,
            "authorization_servers": self.authorization_servers,
            "scopes_supported": self.scopes,
            "bearer_methods_supported": ["header"],
        });

        if let Some(doc) = self.documentation_uri {
            metadata["resource_documentation"] = Value::String(doc);
        }

        metadata
    }
}

/// WWW-Authenticate header builder
///
/// Implements RFC 9728 section 5.1 (`resource_metadata`) together with the
/// RFC 6750 error attributes.
#[derive(Debug, Clone, Default)]
pub struct WwwAuthenticateBuilder {
    /// Resource metadata URI
    metadata_uri: Option<String>,
    /// Scope required for this resource
    scope: Option<String>,
    /// Error code
    error: Option<String>,
    /// Error description
    error_description: Option<String>,
}

impl WwwAuthenticateBuilder {
    /// Create a new WWW-Authenticate builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Point clients at the resource metadata document
    #[must_use]
    pub fn with_resource_metadata(mut self, uri: impl Into<String>) -> Self {
        self.metadata_uri = Some(uri.into());
        self
    }

    /// Set required scope (space separated)
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set error code and description
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>, description: Option<String>) -> Self {
        self.error = Some(error.into());
        self.error_description = description;
        self
    }

    /// Build the header value
    ///
    /// ```text
    /// Bearer resource_metadata="https://api.example.com/.well-known/oauth-protected-resource", scope="weather:read"
    /// ```
    pub fn build(&self) -> String {
        let attributes: Vec<String> = [
            ("resource_metadata", &self.metadata_uri),
            ("scope", &self.scope),
            ("error", &self.error),
            ("error_description", &self.error_description),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .map(|v| format!("{name}=\"{}\"", quote_escape(v)))
        })
        .collect();

        if attributes.is_empty() {
            "Bearer".to_string()
        } else {
            format!("Bearer {}", attributes.join(", "))
        }
    }
}

fn quote_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Extract the credential from an `Authorization: Bearer <credential>` value
///
/// The scheme is case-insensitive. Returns `None` for any other scheme, a
/// missing credential, or trailing extra tokens.
///
/// ```rust
/// use mcpgate_auth::server::extract_bearer;
///
/// assert_eq!(extract_bearer("Bearer demo-token"), Some("demo-token"));
/// assert_eq!(extract_bearer("BEARER demo-token"), Some("demo-token"));
/// assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
/// ```
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;
    let credential = parts.next()?;

    if !scheme.eq_ignore_ascii_case("bearer") || parts.next().is_some() {
        return None;
    }
    Some(credential)
}

/// 401 body; identical for every rejected credential
pub fn unauthorized_response_body(metadata_uri: Option<&str>) -> Value {
    let mut response = json!({
        "error": "invalid_token",
        "error_description": "Valid bearer credential required",
    });

    if let Some(uri) = metadata_uri {
        response["resource_metadata"] = Value::String(uri.to_string());
    }

    response
}

/// 403 body naming the missing scopes
pub fn insufficient_scope_response_body(forbidden: &Forbidden) -> Value {
    json!({
        "error": "insufficient_scope",
        "error_description": "The credential lacks required scopes",
        "missing_scopes": forbidden.missing,
    })
}

/// Full HTTP response for an [`AuthError`]
///
/// 401s carry a `WWW-Authenticate` challenge pointing at the metadata
/// document; 403s add `error="insufficient_scope"` and the missing scopes.
pub fn auth_error_response<B>(error: &AuthError, metadata_uri: Option<&str>) -> Response<B>
where
    B: From<String>,
{
    let mut challenge = WwwAuthenticateBuilder::new();
    if let Some(uri) = metadata_uri {
        challenge = challenge.with_resource_metadata(uri);
    }

    let body = match error {
        AuthError::Unauthenticated(_) => unauthorized_response_body(metadata_uri),
        AuthError::Forbidden(forbidden) => {
            challenge = challenge
                .with_error(error.oauth_error_code(), None)
                .with_scope(forbidden.missing_scope_string());
            insufficient_scope_response_body(forbidden)
        }
    };

    let mut response = Response::new(B::from(body.to_string()));
    *response.status_mut() = error.status_code();

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if let Ok(value) = HeaderValue::from_str(&challenge.build()) {
        headers.insert(header::WWW_AUTHENTICATE, value);
    }

    response
}
