//! HTTP application
//!
//! - `POST /mcp` - JSON-RPC endpoint behind the auth layer
//! - `GET /.well-known/oauth-protected-resource` - RFC 9728 metadata
//! - `GET /health` - liveness
//!
//! Unauthenticated calls to `/mcp` never reach the handler; the layer
//! answers them with 401. Tool calls lacking scopes get 403 with a
//! JSON-RPC error listing the missing scopes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mcpgate_auth::server::{
    PROTECTED_RESOURCE_METADATA_PATH, ProtectedResourceMetadataBuilder, auth_error_response,
};
use mcpgate_auth::tower::{AuthLayer, AuthLayerConfig};
use mcpgate_auth::{AuthError, CompositeVerifier, IdentityContext, ScopeSet};
use serde_json::{Value, json};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::ServerConfig;
use crate::tools::{TOOLS, ToolError, call_tool};

/// JSON-RPC error codes
mod rpc_code {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const UNAUTHORIZED: i64 = -32001;
    pub const FORBIDDEN: i64 = -32003;
}

const PROTOCOL_VERSION: &str = "2025-06-18";

/// Build the application from configuration
///
/// # Errors
///
/// Returns the verifier's configuration error if a strategy cannot be built.
pub fn build_router(config: &ServerConfig) -> Result<Router, mcpgate_auth::ConfigError> {
    let verifier = CompositeVerifier::from_config(&config.auth)?;
    Ok(router_with_verifier(config, verifier))
}

/// Build the application around an already constructed verifier
pub fn router_with_verifier(config: &ServerConfig, verifier: CompositeVerifier) -> Router {
    let metadata_url = config.resource_metadata_url();

    let mut scopes: ScopeSet = verifier.required_scopes().clone();
    scopes.extend(TOOLS.iter().flat_map(|tool| tool.scopes()));

    let metadata = config
        .authorization_servers
        .iter()
        .fold(
            ProtectedResourceMetadataBuilder::new(&config.resource_url),
            |builder, server| builder.with_authorization_server(server),
        )
        .with_scopes(scopes)
        .build();
    let metadata = Arc::new(metadata);

    let auth = AuthLayer::new(verifier).config(
        AuthLayerConfig::default().resource_metadata_url(metadata_url.clone()),
    );

    let mcp = Router::new()
        .route("/mcp", post(handle_mcp))
        .route_layer(auth)
        .layer(Extension(Arc::new(metadata_url)));

    Router::new()
        .route(
            PROTECTED_RESOURCE_METADATA_PATH,
            get(move || {
                let metadata = Arc::clone(&metadata);
                async move { Json(metadata.as_ref().clone()) }
            }),
        )
        .route("/health", get(|| async { "ok" }))
        .merge(mcp)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
}

async fn handle_mcp(
    Extension(ctx): Extension<IdentityContext>,
    Extension(metadata_url): Extension<Arc<String>>,
    Json(request): Json<Value>,
) -> Response {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return rpc_error(id, rpc_code::INVALID_REQUEST, "Missing method", None).into_response();
    };

    debug!(method, request_id = %ctx.request_id(), "Handling MCP request");

    if method.starts_with("notifications/") {
        return StatusCode::ACCEPTED.into_response();
    }

    let params = request.get("params").cloned().unwrap_or(Value::Null);
    match method {
        "initialize" => rpc_result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "mcpgate", "version": env!("CARGO_PKG_VERSION")},
            }),
        )
        .into_response(),
        "ping" => rpc_result(id, json!({})).into_response(),
        "tools/list" => rpc_result(
            id,
            json!({"tools": TOOLS.iter().map(|tool| tool.describe()).collect::<Vec<_>>()}),
        )
        .into_response(),
        "tools/call" => {
            let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

            match call_tool(&ctx, name, &arguments) {
                Ok(result) => rpc_result(
                    id,
                    json!({
                        "content": [{"type": "text", "text": result.to_string()}],
                        "structuredContent": result,
                        "isError": false,
                    }),
                )
                .into_response(),
                Err(ToolError::Auth(error)) => auth_rpc_error(id, &error, &metadata_url),
                Err(error @ (ToolError::UnknownTool(_) | ToolError::InvalidArguments(_))) => {
                    rpc_error(id, rpc_code::INVALID_PARAMS, &error.to_string(), None)
                        .into_response()
                }
            }
        }
        other => rpc_error(
            id,
            rpc_code::METHOD_NOT_FOUND,
            &format!("Method not found: {other}"),
            None,
        )
        .into_response(),
    }
}

fn rpc_result(id: Value, result: Value) -> Json<Value> {
    Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

fn rpc_error(id: Value, code: i64, message: &str, data: Option<Value>) -> Json<Value> {
    let mut error = json!({"code": code, "message": message});
    if let Some(data) = data {
        error["data"] = data;
    }
    Json(json!({"jsonrpc": "2.0", "id": id, "error": error}))
}

/// 401/403 with the auth challenge headers and a JSON-RPC error body
fn auth_rpc_error(id: Value, error: &AuthError, metadata_url: &str) -> Response {
    let (code, data) = match error {
        AuthError::Unauthenticated(_) => (rpc_code::UNAUTHORIZED, None),
        AuthError::Forbidden(forbidden) => (
            rpc_code::FORBIDDEN,
            Some(json!({"missing_scopes": forbidden.missing})),
        ),
    };
    let body = rpc_error(id, code, &error.to_string(), data).0;

    let (parts, _) = auth_error_response::<Body>(error, Some(metadata_url)).into_parts();
    Response::from_parts(parts, Body::from(body.to_string()))
}
