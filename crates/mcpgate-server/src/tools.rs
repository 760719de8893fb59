//! Weather tools
//!
//! Each tool names the scopes it needs in the server's own vocabulary and
//! checks them against the request's [`IdentityContext`] before running.

use mcpgate_auth::{AuthError, IdentityContext, ScopeSet, scope_set};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

/// Longest forecast served
pub const MAX_FORECAST_DAYS: u64 = 16;

const DEFAULT_CITY: &str = "London";

/// Tool invocation failures
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments missing or of the wrong shape
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Caller not authenticated, or missing scopes
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Static tool description
#[derive(Debug, Clone, Copy)]
pub struct Tool {
    /// Tool name
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Scopes a caller must hold
    pub required_scopes: &'static [&'static str],
}

impl Tool {
    /// Required scopes as a set
    pub fn scopes(&self) -> ScopeSet {
        scope_set(self.required_scopes.iter().copied())
    }

    /// JSON Schema of the tool's arguments
    pub fn input_schema(&self) -> Value {
        match self.name {
            "get_forecast" => json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "days": {"type": "integer", "minimum": 1, "maximum": MAX_FORECAST_DAYS},
                },
                "required": ["city", "days"],
            }),
            _ => json!({
                "type": "object",
                "properties": {"city": {"type": "string", "default": DEFAULT_CITY}},
            }),
        }
    }

    /// Listing entry, as returned by `tools/list`
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
            "requiredScopes": self.required_scopes,
        })
    }
}

/// Every tool this server offers
pub const TOOLS: &[Tool] = &[
    Tool {
        name: "get_weather",
        description: "Get weather data for a city.",
        required_scopes: &["weather:read"],
    },
    Tool {
        name: "get_forecast",
        description: "Get weather forecast for a city.",
        required_scopes: &["weather:read", "weather:forecast"],
    },
];

/// Look a tool up by name
pub fn find_tool(name: &str) -> Option<&'static Tool> {
    TOOLS.iter().find(|tool| tool.name == name)
}

/// Run `name` for the identity bound to `ctx`
///
/// # Errors
///
/// - [`ToolError::UnknownTool`] for names not in [`TOOLS`]
/// - [`ToolError::Auth`] when the context is unbound or lacks the tool's scopes
/// - [`ToolError::InvalidArguments`] for bad arguments
pub fn call_tool(ctx: &IdentityContext, name: &str, arguments: &Value) -> Result<Value, ToolError> {
    let tool = find_tool(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
    let identity = ctx.require_scopes(&tool.scopes())?;

    info!(
        tool = tool.name,
        client_id = %identity.client_id(),
        request_id = %ctx.request_id(),
        "Calling tool"
    );

    match tool.name {
        "get_weather" => Ok(get_weather(
            arguments
                .get("city")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_CITY),
        )),
        "get_forecast" => {
            let city = arguments
                .get("city")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArguments("city is required".to_string()))?;
            let days = arguments
                .get("days")
                .and_then(Value::as_u64)
                .filter(|days| (1..=MAX_FORECAST_DAYS).contains(days))
                .ok_or_else(|| {
                    ToolError::InvalidArguments(format!(
                        "days must be an integer between 1 and {MAX_FORECAST_DAYS}"
                    ))
                })?;
            Ok(get_forecast(city, days))
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn get_weather(city: &str) -> Value {
    json!({
        "city": city,
        "temperature": "22",
        "condition": "Partly cloudy",
        "humidity": "65%",
    })
}

fn get_forecast(city: &str, days: u64) -> Value {
    let forecast: Vec<Value> = (0..days)
        .map(|i| {
            json!({
                "day": i + 1,
                "temperature": (20 + i).to_string(),
                "condition": "Sunny",
            })
        })
        .collect();

    json!({
        "city": city,
        "days": days,
        "forecast": forecast,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpgate_auth::{AllowListVerifier, CompositeVerifier, IdentityFields};

    async fn context_with(scopes: &[&str]) -> IdentityContext {
        let verifier = CompositeVerifier::new().with_strategy(AllowListVerifier::new(
            "test",
            ["token"],
            IdentityFields::new("client").with_scopes(scopes.iter().copied()),
        ));
        IdentityContext::bound(verifier.verify("token").await.unwrap())
    }

    #[tokio::test]
    async fn test_get_weather_defaults_to_london() {
        let ctx = context_with(&["weather:read"]).await;
        let result = call_tool(&ctx, "get_weather", &json!({})).unwrap();
        assert_eq!(result["city"], "London");
        assert_eq!(result["temperature"], "22");
        assert_eq!(result["humidity"], "65%");
    }

    #[tokio::test]
    async fn test_get_forecast() {
        let ctx = context_with(&["weather:read", "weather:forecast"]).await;
        let result = call_tool(&ctx, "get_forecast", &json!({"city": "Paris", "days": 3})).unwrap();
        assert_eq!(result["days"], 3);
        assert_eq!(
            result["forecast"][2],
            json!({"day": 3, "temperature": "22", "condition": "Sunny"})
        );
    }

    #[tokio::test]
    async fn test_forecast_requires_both_scopes() {
        let ctx = context_with(&["weather:read"]).await;
        let err = call_tool(&ctx, "get_forecast", &json!({"city": "Paris", "days": 1})).unwrap_err();
        match err {
            ToolError::Auth(AuthError::Forbidden(forbidden)) => {
                assert_eq!(forbidden.missing, scope_set(["weather:forecast"]));
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_forecast_day_bounds() {
        let ctx = context_with(&["weather:read", "weather:forecast"]).await;
        for days in [json!(0), json!(MAX_FORECAST_DAYS + 1), json!("three")] {
            assert!(matches!(
                call_tool(&ctx, "get_forecast", &json!({"city": "Paris", "days": days})),
                Err(ToolError::InvalidArguments(_))
            ));
        }
    }

    #[test]
    fn test_unbound_context_is_unauthenticated() {
        let ctx = IdentityContext::new();
        assert!(matches!(
            call_tool(&ctx, "get_weather", &json!({})),
            Err(ToolError::Auth(AuthError::Unauthenticated(_)))
        ));
    }

    #[test]
    fn test_unknown_tool() {
        let ctx = IdentityContext::new();
        assert!(matches!(
            call_tool(&ctx, "get_stock_price", &json!({})),
            Err(ToolError::UnknownTool(_))
        ));
    }
}
