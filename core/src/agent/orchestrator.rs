use crate::agent::ToolCatalog;
use crate::error::{OrchestratorError, OrchestratorResult, ToolError};
use crate::traits::{
    ChatMessage, CompletionRequest, ModelEndpoint, ModelParams, Role, ToolCall, ToolDescriptor,
    ToolProvider, ToolResult,
};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_MAX_ROUNDS: usize = 20;

/// How the tool calls of a single model response are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Run all calls of a round at once; results are still appended in
    /// request order.
    #[default]
    Concurrent,
    Sequential,
}

/// Progress notifications emitted while a turn runs.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    RoundStarted { round: usize },
    ToolCallStarted { call: ToolCall },
    ToolCallFinished { tool_name: String, result: ToolResult },
}

pub type TurnObserver = Arc<dyn Fn(&TurnEvent) + Send + Sync>;

/// Drives one user turn from submission to final answer, running as many
/// tool-call rounds as the model asks for.
///
/// Holds configuration only. The tool catalog and its bindings live for a
/// single call of [`run_turn`](Self::run_turn).
pub struct ToolOrchestrator {
    endpoint: Arc<dyn ModelEndpoint>,
    max_rounds: usize,
    dispatch_mode: DispatchMode,
    tool_timeout: Option<Duration>,
    observer: Option<TurnObserver>,
}

impl ToolOrchestrator {
    pub fn new(endpoint: Arc<dyn ModelEndpoint>) -> Self {
        Self {
            endpoint,
            max_rounds: DEFAULT_MAX_ROUNDS,
            dispatch_mode: DispatchMode::default(),
            tool_timeout: None,
            observer: None,
        }
    }

    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn with_observer(mut self, observer: TurnObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub async fn run_turn(
        &self,
        conversation: &mut Vec<ChatMessage>,
        providers: &[Arc<dyn ToolProvider>],
        params: &ModelParams,
    ) -> OrchestratorResult<String> {
        self.run_turn_with_cancel(conversation, providers, params, &CancellationToken::new())
            .await
    }

    /// Runs a turn that stops with [`OrchestratorError::Cancelled`] as soon as
    /// `cancel` fires. A round is appended to `conversation` only once all of
    /// its tool calls have resolved, so cancellation never leaves a call
    /// without its result.
    pub async fn run_turn_with_cancel(
        &self,
        conversation: &mut Vec<ChatMessage>,
        providers: &[Arc<dyn ToolProvider>],
        params: &ModelParams,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<String> {
        validate_conversation(conversation)?;

        let catalog = ToolCatalog::build(providers).await?;
        info!(
            endpoint = self.endpoint.name(),
            tools = catalog.len(),
            messages = conversation.len(),
            "Starting turn"
        );

        let mut output = String::new();

        for round in 1..=self.max_rounds {
            if cancel.is_cancelled() {
                return Err(OrchestratorError::Cancelled);
            }
            self.notify(&TurnEvent::RoundStarted { round });

            let request = CompletionRequest {
                messages: conversation.as_slice(),
                tools: catalog.descriptors(),
                params,
            };
            let completion = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                completion = self.endpoint.complete(request) => completion?,
            };

            if let Some(usage) = &completion.usage {
                debug!(
                    round,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Model round completed"
                );
            }

            let mut round_messages = Vec::new();
            let mut requested_tools = false;

            for choice in completion.choices {
                if choice.has_tool_calls() {
                    requested_tools = true;
                    debug!(
                        round,
                        calls = choice.tool_calls.len(),
                        finish_reason = choice.finish_reason.as_deref().unwrap_or(""),
                        "Model requested tool calls"
                    );

                    let results = self.dispatch(&catalog, &choice.tool_calls, cancel).await?;
                    round_messages.push(ChatMessage::assistant_with_tool_calls(
                        choice.content.unwrap_or_default(),
                        choice.tool_calls.clone(),
                    ));
                    round_messages.extend(choice.tool_calls.iter().zip(results).map(
                        |(call, result)| {
                            ChatMessage::tool_result(result.call_id, &call.name, result.content)
                        },
                    ));
                } else if let Some(text) = choice.content.filter(|c| !c.is_empty()) {
                    output.push_str(&text);
                    round_messages.push(ChatMessage::assistant(text));
                }
            }

            conversation.extend(round_messages);

            if !requested_tools {
                info!(round, chars = output.len(), "Turn finished");
                return Ok(output);
            }
        }

        warn!(max_rounds = self.max_rounds, "Turn hit the round limit");
        Err(OrchestratorError::RoundLimitExceeded(self.max_rounds))
    }

    async fn dispatch(
        &self,
        catalog: &ToolCatalog,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> OrchestratorResult<Vec<ToolResult>> {
        let work = async {
            match self.dispatch_mode {
                DispatchMode::Concurrent => {
                    join_all(calls.iter().map(|call| self.dispatch_one(catalog, call, cancel)))
                        .await
                        .into_iter()
                        .collect::<OrchestratorResult<Vec<_>>>()
                }
                DispatchMode::Sequential => {
                    let mut results = Vec::with_capacity(calls.len());
                    for call in calls {
                        results.push(self.dispatch_one(catalog, call, cancel).await?);
                    }
                    Ok::<_, OrchestratorError>(results)
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
            results = work => results,
        }
    }

    async fn dispatch_one(
        &self,
        catalog: &ToolCatalog,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<ToolResult> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }
        self.notify(&TurnEvent::ToolCallStarted { call: call.clone() });

        let result = match self.invoke(catalog, call).await {
            Ok(content) => {
                debug!(tool = %call.name, call_id = %call.id, "Tool call succeeded");
                ToolResult::success(&call.id, content)
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                ToolResult::error(&call.id, &e)
            }
        };

        self.notify(&TurnEvent::ToolCallFinished {
            tool_name: call.name.clone(),
            result: result.clone(),
        });
        Ok(result)
    }

    async fn invoke(&self, catalog: &ToolCatalog, call: &ToolCall) -> Result<String, ToolError> {
        let (provider, descriptor) = catalog
            .resolve(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let args = parse_arguments(descriptor, call)?;

        let invocation = provider.invoke(&call.name, args);
        match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, invocation).await.map_err(|_| {
                ToolError::execution(
                    &call.name,
                    format!("timed out after {:.1}s", limit.as_secs_f64()),
                )
            })?,
            None => invocation.await,
        }
    }

    fn notify(&self, event: &TurnEvent) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}

fn validate_conversation(conversation: &[ChatMessage]) -> OrchestratorResult<()> {
    match conversation.last() {
        None => Err(OrchestratorError::InvalidConversation(
            "conversation is empty".to_string(),
        )),
        Some(last) if last.role != Role::User => Err(OrchestratorError::InvalidConversation(
            format!("last message must be a user message, found {}", last.role),
        )),
        Some(_) => Ok(()),
    }
}

/// An empty argument string means "no arguments".
fn parse_arguments(descriptor: &ToolDescriptor, call: &ToolCall) -> Result<Value, ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments {
        name: call.name.clone(),
        reason,
    };

    let raw = call.arguments.trim();
    let args = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?
    };

    descriptor.check_arguments(&args).map_err(invalid)?;
    Ok(args)
}
