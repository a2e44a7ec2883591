use crate::error::ToolError;
use crate::traits::{ToolDescriptor, ToolProvider};
use async_trait::async_trait;
use rmcp::{
    RoleClient, ServiceExt,
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, Tool as McpTool,
    },
    service::RunningService,
    transport::StreamableHttpClientTransport,
};
use serde_json::Value;

/// Remote tool provider speaking MCP over the streamable HTTP transport.
pub struct McpToolProvider {
    name: String,
    client: RunningService<RoleClient, ClientInfo>,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolweave".to_string(),
            title: Some("toolweave".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

impl McpToolProvider {
    pub async fn connect_http(name: impl Into<String>, url: &str) -> Result<Self, ToolError> {
        let name = name.into();
        tracing::info!(provider = %name, %url, "Connecting to MCP server");

        let transport = StreamableHttpClientTransport::from_uri(url);
        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| ToolError::Transport(format!("{name}: {e}")))?;

        if let Some(info) = client.peer_info() {
            tracing::info!(
                provider = %name,
                server = %info.server_info.name,
                version = %info.server_info.version,
                "MCP server initialized"
            );
        }

        Ok(Self { name, client })
    }
}

fn descriptor_from_mcp(tool: McpTool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        parameters: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

/// Joins the text parts of a call result. Results without any text are
/// passed on as their JSON encoding so the model still sees something.
fn result_text(result: &CallToolResult) -> String {
    let text = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        serde_json::to_string(result).unwrap_or_default()
    } else {
        text
    }
}

/// MCP carries call arguments as a JSON object; `null` means no arguments.
fn call_params(tool_name: &str, args: Value) -> Result<CallToolRequestParams, ToolError> {
    let arguments = match args {
        Value::Object(map) => Some(map),
        Value::Null => None,
        other => {
            return Err(ToolError::InvalidArguments {
                name: tool_name.to_string(),
                reason: format!("expected a JSON object, got {other}"),
            });
        }
    };

    Ok(CallToolRequestParams {
        meta: None,
        name: tool_name.to_owned().into(),
        arguments,
        task: None,
    })
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| ToolError::Transport(format!("{}: {}", self.name, e)))?;

        tracing::debug!(provider = %self.name, tools = result.tools.len(), "Listed MCP tools");
        Ok(result.tools.into_iter().map(descriptor_from_mcp).collect())
    }

    async fn invoke(&self, tool_name: &str, args: Value) -> Result<String, ToolError> {
        tracing::debug!(provider = %self.name, tool = tool_name, "Calling MCP tool");

        let params = call_params(tool_name, args)?;

        let result = self
            .client
            .call_tool(params)
            .await
            .map_err(|e| ToolError::execution(tool_name, format!("MCP error: {e}")))?;

        let text = result_text(&result);
        if result.is_error.unwrap_or(false) {
            Err(ToolError::execution(tool_name, text))
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;
    use serde_json::json;

    #[test]
    fn joins_text_parts() {
        let result = CallToolResult::success(vec![
            Content::text("12:00 in Hong Kong."),
            Content::text("Convert to the city's offset."),
        ]);
        assert_eq!(
            result_text(&result),
            "12:00 in Hong Kong.\nConvert to the city's offset."
        );
    }

    #[test]
    fn falls_back_to_json_without_text() {
        let result = CallToolResult::success(vec![]);
        let text = result_text(&result);
        assert!(text.starts_with('{'));
    }

    #[test]
    fn error_results_keep_their_text() {
        let result = CallToolResult::error(vec![Content::text("city not supported")]);
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result_text(&result), "city not supported");
    }

    #[test]
    fn object_arguments_are_forwarded() {
        let params = call_params("GetCurrentTime", json!({ "city": "Tokyo" })).unwrap();
        assert_eq!(params.name, "GetCurrentTime");
        assert_eq!(params.arguments.unwrap()["city"], "Tokyo");
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = call_params("GetCurrentTime", json!(["Tokyo"])).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref name, .. } if name == "GetCurrentTime"));
        assert!(err.to_string().contains("expected a JSON object"));
    }
}
