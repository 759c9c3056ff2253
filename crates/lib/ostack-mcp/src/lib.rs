//! MCP server implementation for ostack-mcp.
//!
//! This crate wires the compute control plane into the MCP handler surface
//! and renders tool results as text for MCP clients.

pub mod server;
pub mod tools;

use std::sync::Arc;

use ostack_core::compute::ComputeControl;
use rmcp::model::{
    CallToolRequestParams,
    CallToolResult,
    ListToolsResult,
    PaginatedRequestParams,
    ServerCapabilities,
    ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData, ServerHandler};

const SERVER_INSTRUCTIONS: &str = r"ostack-mcp exposes OpenStack Nova compute queries as MCP tools.

Workflow:
1. Call `list_servers` to enumerate compute servers visible to the configured project.
2. Narrow results with `filters` (server-side Nova query parameters such as status or name).
3. Page through large listings with `limit` and `marker`.

Notes:
- Credentials come from the daemon environment (OS_* variables); the protocol never carries secrets.
- `all_projects` spans every project and requires an administrative role.
- `detailed` defaults to true and includes addresses, flavor, and image data.";

/// MCP server wrapper around the compute control plane.
#[derive(Clone)]
pub struct OstackMcp {
    control: Arc<ComputeControl>,
}

impl OstackMcp {
    /// Creates a new server owning its control plane.
    #[must_use]
    pub fn new(control: ComputeControl) -> Self {
        Self::with_control(Arc::new(control))
    }

    /// Creates a new server using a shared control-plane handle.
    #[must_use]
    pub const fn with_control(control: Arc<ComputeControl>) -> Self {
        Self { control }
    }
}

impl ServerHandler for OstackMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: tools::compute::descriptors(),
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(tools::compute::dispatch(&self.control, &request.name, request.arguments).await)
    }
}
