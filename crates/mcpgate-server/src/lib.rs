//! # MCPGate Server
//!
//! A weather tool server whose MCP endpoint is protected by
//! [`mcpgate_auth::CompositeVerifier`]. Which credentials are accepted is
//! entirely a matter of configuration; see `mcpgate.toml` for a sample that
//! accepts a demo token, an API key, and two families of signed tokens.
//!
//! ## Modules
//!
//! - [`config`] - file and environment configuration
//! - [`logging`] - `tracing-subscriber` setup
//! - [`tools`] - the weather tools and their scope requirements
//! - [`app`] - the axum router

pub mod app;
pub mod config;
pub mod logging;
pub mod tools;

pub use app::{build_router, router_with_verifier};
pub use config::{LoggingConfig, ServerConfig};
