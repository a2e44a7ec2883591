pub mod endpoint;
pub mod tool;
pub mod tool_provider;

pub use endpoint::{
    ChatMessage, Choice, Completion, CompletionRequest, ModelEndpoint, ModelParams, Role,
    ToolCall, Usage,
};
pub use tool::{Tool, ToolDescriptor, ToolResult};
pub use tool_provider::ToolProvider;
