//! Error types shared by the orchestrator, endpoints and tool providers.

use thiserror::Error;

/// Errors raised by a model endpoint. Always fatal to the current turn.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("{endpoint} API error ({status}): {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised while listing or invoking tools.
///
/// Inside a turn, every variant except `Transport` during listing is turned
/// into a tool-result message instead of failing the turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Tool '{name}' failed: {message}")]
    Execution { name: String, message: String },

    #[error("Tool provider unavailable: {0}")]
    Transport(String),
}

impl ToolError {
    pub fn execution(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Execution {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

/// Turn-level failures of [`ToolOrchestrator`](crate::agent::ToolOrchestrator).
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Two providers advertise the same tool name
    #[error("Duplicate tool '{name}' advertised by providers '{first}' and '{second}'")]
    DuplicateTool {
        name: String,
        first: String,
        second: String,
    },

    /// The conversation handed to the turn is not usable
    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    /// A provider could not list its tools
    #[error("Failed to list tools from provider '{provider}': {source}")]
    ToolListing {
        provider: String,
        #[source]
        source: ToolError,
    },

    #[error("Model endpoint failed: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Turn exceeded {0} model rounds without a final answer")]
    RoundLimitExceeded(usize),

    #[error("Turn cancelled")]
    Cancelled,
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
