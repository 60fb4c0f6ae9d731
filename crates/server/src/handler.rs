//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the key-value tool implementations.
use crate::tools::kv::{
    self, KvDeleteParams, KvGetParams, KvMgetParams, KvMsetParams, KvSetParams, KvTtlParams,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use sqlkv_core::KvStore;

/// The main MCP server handler for sqlkv.
#[derive(Clone)]
pub struct SqlKvServer {
    store: KvStore,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SqlKvServer {
    /// Create a handler serving one store namespace.
    pub fn new(store: KvStore) -> Self {
        Self { store, tool_router: Self::tool_router() }
    }

    #[tool(description = "Get the value stored under a key. Expired or undecodable entries read as not found.")]
    async fn kv_get(&self, params: Parameters<KvGetParams>) -> Result<CallToolResult, McpError> {
        kv::get_impl(&self.store, params.0).await
    }

    #[tool(description = "Get several keys at once. Returns one slot per key in request order, null where absent.")]
    async fn kv_mget(&self, params: Parameters<KvMgetParams>) -> Result<CallToolResult, McpError> {
        kv::mget_impl(&self.store, params.0).await
    }

    #[tool(description = "Store a JSON value under a key, replacing any existing entry. Optional ttl_ms in milliseconds.")]
    async fn kv_set(&self, params: Parameters<KvSetParams>) -> Result<CallToolResult, McpError> {
        kv::set_impl(&self.store, params.0).await
    }

    #[tool(description = "Store several key/value entries atomically with one shared expiration.")]
    async fn kv_mset(&self, params: Parameters<KvMsetParams>) -> Result<CallToolResult, McpError> {
        kv::mset_impl(&self.store, params.0).await
    }

    #[tool(description = "Delete a key. Reports whether an entry was removed.")]
    async fn kv_delete(&self, params: Parameters<KvDeleteParams>) -> Result<CallToolResult, McpError> {
        kv::delete_impl(&self.store, params.0).await
    }

    #[tool(description = "Delete every entry in the namespace.")]
    async fn kv_reset(&self) -> Result<CallToolResult, McpError> {
        kv::reset_impl(&self.store).await
    }

    #[tool(description = "Remaining lifetime of a key in milliseconds, or -1 when the key has no entry.")]
    async fn kv_ttl(&self, params: Parameters<KvTtlParams>) -> Result<CallToolResult, McpError> {
        kv::ttl_impl(&self.store, params.0).await
    }

    #[tool(description = "Remove expired entries now. Returns the number deleted.")]
    async fn kv_purge(&self) -> Result<CallToolResult, McpError> {
        kv::purge_impl(&self.store).await
    }
}

impl ServerHandler for SqlKvServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sqlkv".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!("Key-value store over SQLite, namespace `{}`.", self.store.name())),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
