use crate::error::ToolError;
use crate::traits::ToolDescriptor;
use async_trait::async_trait;
use serde_json::Value;

/// A backend exposing named, schema-described operations, local or remote.
///
/// `list_tools` must reflect the provider's current state: it is called once
/// at the start of every turn and never cached across turns. A listing
/// failure is a transport problem and fails the turn.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Label used in logs and duplicate-name errors.
    fn name(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    async fn invoke(&self, tool_name: &str, args: Value) -> Result<String, ToolError>;
}
