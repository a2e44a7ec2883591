use crate::error::EndpointError;
use crate::traits::{
    ChatMessage, Choice, Completion, CompletionRequest, ModelEndpoint, ModelParams, Role,
    ToolCall, ToolDescriptor, Usage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const ENDPOINT_NAME: &str = "openai";

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool<'a>>>,
    #[serde(flatten)]
    params: &'a ModelParams,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest<'a> {
    id: &'a str,
    r#type: &'a str,
    function: OpenAIFunctionRequest<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionRequest<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    r#type: &'a str,
    function: OpenAIToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(default)]
    arguments: Option<serde_json::Value>,
}

/// Some compatible servers send `arguments` as a JSON object or `null`
/// instead of an encoded string. All forms are normalized back to raw text.
fn arguments_text(arguments: Option<serde_json::Value>) -> String {
    match arguments {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(raw)) => raw,
        Some(other) => other.to_string(),
    }
}

/// OpenAI-compatible `/chat/completions` endpoint.
///
/// The key is sent both as a bearer token and as an `api-key` header so the
/// same configuration works against OpenAI, Azure OpenAI and key-injecting
/// proxies in front of either.
pub struct OpenAiEndpoint {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiEndpoint {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn chat_request(&self, body: &OpenAIRequest<'_>) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("api-key", &self.api_key)
            .json(body)
    }

    fn build_request<'a>(&'a self, request: &CompletionRequest<'a>) -> OpenAIRequest<'a> {
        OpenAIRequest {
            model: &self.model,
            messages: convert_messages(request.messages),
            tools: (!request.tools.is_empty()).then(|| convert_tools(request.tools)),
            params: request.params,
        }
    }
}

fn convert_messages(messages: &[ChatMessage]) -> Vec<OpenAIMessage<'_>> {
    messages
        .iter()
        .map(|m| {
            let tool_calls = m.tool_calls.as_ref().map(|tool_calls| {
                tool_calls
                    .iter()
                    .map(|tc| OpenAIToolCallRequest {
                        id: &tc.id,
                        r#type: "function",
                        function: OpenAIFunctionRequest {
                            name: &tc.name,
                            arguments: &tc.arguments,
                        },
                    })
                    .collect()
            });

            // Assistant messages that only carry tool calls go out with a null body.
            let content = if m.role == Role::Assistant && m.has_tool_calls() && m.content.is_empty()
            {
                None
            } else {
                Some(m.content.as_str())
            };

            OpenAIMessage {
                role: m.role.as_str(),
                content,
                tool_calls,
                tool_call_id: m.tool_call_id.as_deref(),
                name: m.name.as_deref(),
            }
        })
        .collect()
}

fn convert_tools(tools: &[ToolDescriptor]) -> Vec<OpenAITool<'_>> {
    tools
        .iter()
        .map(|t| OpenAITool {
            r#type: "function",
            function: OpenAIToolFunction {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            },
        })
        .collect()
}

fn check_status(status: reqwest::StatusCode, body: String) -> Result<String, EndpointError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(EndpointError::Api {
            endpoint: ENDPOINT_NAME.to_string(),
            status: status.as_u16(),
            message: body,
        })
    }
}

fn parse_completion(body: &str) -> Result<Completion, EndpointError> {
    let response: OpenAIResponse =
        serde_json::from_str(body).map_err(|e| EndpointError::InvalidResponse(e.to_string()))?;

    let choices = response
        .choices
        .into_iter()
        .map(|choice| Choice {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|c| ToolCall {
                    id: c.id,
                    name: c.function.name,
                    arguments: arguments_text(c.function.arguments),
                })
                .collect(),
            finish_reason: choice.finish_reason,
        })
        .collect();

    Ok(Completion {
        choices,
        usage: response.usage,
    })
}

#[async_trait]
impl ModelEndpoint for OpenAiEndpoint {
    fn name(&self) -> &str {
        ENDPOINT_NAME
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, EndpointError> {
        let body = self.build_request(&request);

        let response = self.chat_request(&body).send().await?;

        let status = response.status();
        let text = check_status(status, response.text().await?)?;

        let completion = parse_completion(&text)?;
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Chat completion usage"
            );
        }
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_has_tools_and_flattened_params() {
        let endpoint = OpenAiEndpoint::new("key").with_model("gpt-4o-mini");
        let messages = vec![
            ChatMessage::user("What time is it in Tokyo?"),
            ChatMessage::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "GetCurrentTime", r#"{"city":"Tokyo"}"#)],
            ),
            ChatMessage::tool_result("call_1", "GetCurrentTime", "12:00"),
        ];
        let tools = vec![ToolDescriptor::new(
            "GetCurrentTime",
            "Get the current time for a city",
            json!({ "type": "object" }),
        )];
        let params = ModelParams {
            max_tokens: Some(128),
            ..Default::default()
        };
        let request = CompletionRequest {
            messages: &messages,
            tools: &tools,
            params: &params,
        };

        let body = serde_json::to_value(endpoint.build_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 128);
        assert!(body.get("params").is_none());
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "GetCurrentTime");
        assert!(body["messages"][1]["content"].is_null());
        assert_eq!(body["messages"][1]["tool_calls"][0]["function"]["arguments"], r#"{"city":"Tokyo"}"#);
        assert_eq!(body["messages"][2]["tool_call_id"], "call_1");
        assert_eq!(body["messages"][2]["name"], "GetCurrentTime");
    }

    #[test]
    fn request_body_omits_empty_tool_list() {
        let endpoint = OpenAiEndpoint::new("key");
        let messages = vec![ChatMessage::user("hi")];
        let params = ModelParams::default();
        let request = CompletionRequest {
            messages: &messages,
            tools: &[],
            params: &params,
        };

        let body = serde_json::to_value(endpoint.build_request(&request)).unwrap();
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn parses_tool_call_response() {
        let body = json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "GetCurrentTime", "arguments": "{\"city\":\"Tokyo\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 50, "completion_tokens": 12, "total_tokens": 62 }
        })
        .to_string();

        let completion = parse_completion(&body).unwrap();
        let choice = &completion.choices[0];
        assert!(choice.has_tool_calls());
        assert_eq!(choice.tool_calls[0].name, "GetCurrentTime");
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(completion.usage.unwrap().total_tokens, 62);
    }

    #[test]
    fn parses_empty_choice_without_error() {
        let body = r#"{"choices":[{"message":{"role":"assistant"},"finish_reason":"stop"}]}"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.choices[0].content, None);
        assert!(!completion.choices[0].has_tool_calls());
    }

    fn single_call_arguments(arguments: serde_json::Value) -> String {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "GetCurrentTime", "arguments": arguments }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })
        .to_string();

        let completion = parse_completion(&body).unwrap();
        completion.choices[0].tool_calls[0].arguments.clone()
    }

    #[test]
    fn object_arguments_are_reencoded() {
        let raw = single_call_arguments(json!({ "city": "Tokyo" }));
        let args: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(args, json!({ "city": "Tokyo" }));
    }

    #[test]
    fn null_arguments_become_empty() {
        assert_eq!(single_call_arguments(serde_json::Value::Null), "");
    }

    #[test]
    fn string_arguments_pass_through() {
        assert_eq!(
            single_call_arguments(json!("{\"city\": \"Tokyo\"}")),
            "{\"city\": \"Tokyo\"}"
        );
    }

    #[test]
    fn error_status_maps_to_api_error() {
        let err = check_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "rate limited".to_string(),
        )
        .unwrap_err();

        match err {
            EndpointError::Api {
                endpoint,
                status,
                message,
            } => {
                assert_eq!(endpoint, "openai");
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            check_status(reqwest::StatusCode::OK, "{}".to_string()).unwrap(),
            "{}"
        );
    }

    #[test]
    fn request_carries_both_key_headers() {
        let endpoint = OpenAiEndpoint::new("sk-test").with_base_url("http://localhost:5000/LLM/");
        let messages = vec![ChatMessage::user("hi")];
        let params = ModelParams::default();
        let request = CompletionRequest {
            messages: &messages,
            tools: &[],
            params: &params,
        };
        let body = endpoint.build_request(&request);

        let http = endpoint.chat_request(&body).build().unwrap();
        assert_eq!(http.url().as_str(), "http://localhost:5000/LLM/chat/completions");
        assert_eq!(http.headers()["authorization"], "Bearer sk-test");
        assert_eq!(http.headers()["api-key"], "sk-test");
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        let err = parse_completion("<html>502</html>").unwrap_err();
        assert!(matches!(err, EndpointError::InvalidResponse(_)));
    }
}
