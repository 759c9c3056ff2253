//! Daemon entry point for the OpenStack MCP server.
//!
//! Loads configuration from the environment, builds the compute control
//! plane with the Keystone connector, and serves the MCP protocol over
//! stdio (or streamable HTTP when enabled).

mod config;

use std::sync::Arc;

use ostack_core::compute::ComputeControl;
use ostack_core::keystone;
use ostack_core::session::SessionManager;
use ostack_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::OstackConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = OstackConfig::from_args()?;

    // Logs go to stderr; stdout belongs to the MCP protocol stream.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(config.log_level.into()))
        .init();

    let sessions = SessionManager::new(config.auth.clone(), keystone::connector());
    let control = Arc::new(ComputeControl::new(Arc::new(sessions)));

    if config.http_serve {
        serve_streamable_http(control, McpHttpServerConfig::new(config.http_addr)).await?;
    } else {
        serve_stdio(control).await?;
    }
    Ok(())
}
