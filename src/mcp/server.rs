// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;

use crate::tools::{ToolDefinition, ToolRegistry};

pub const SERVER_NAME: &str = "scenebridge";

pub const INSTRUCTIONS: &str = "Scenebridge exposes the open editor scene to agents. Start with \
get_editor_context (summaryOnly for large scenes), find nodes with search_nodes, inspect one \
with get_node_info, and change the scene with create_node, delete_node, set_node_property, \
select_nodes or execute_script.";

/// rmcp front end over the shared tool registry. Every transport runs it: stdio,
/// streamable HTTP, SSE sessions and the stateless `/rpc` endpoint.
#[derive(Debug, Clone)]
pub struct SceneBridgeMcp {
    registry: Arc<ToolRegistry>,
}

impl SceneBridgeMcp {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }
}

fn to_rmcp_tool(definition: &ToolDefinition) -> Tool {
    let mut tool = Tool::new(
        definition.name().to_owned(),
        definition.description().to_owned(),
        Arc::new(definition.input_schema()),
    );
    tool.title = Some(definition.title().to_owned());
    tool.output_schema = definition.output_schema().cloned().map(Arc::new);
    tool
}

impl ServerHandler for SceneBridgeMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.registry.list_all().map(to_rmcp_tool).collect()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let arguments = Value::Object(request.arguments.unwrap_or_default());
        match self.registry.execute(&request.name, &arguments).await {
            Ok(value @ Value::Object(_)) => Ok(CallToolResult::structured(value)),
            Ok(Value::String(text)) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Ok(value) => Ok(CallToolResult::success(vec![Content::text(value.to_string())])),
            Err(err) if err.is_tool_failure() => {
                tracing::warn!(tool = %request.name, %err, "tool failed");
                Ok(err.to_call_result())
            }
            Err(err) => Err(err.into()),
        }
    }
}
