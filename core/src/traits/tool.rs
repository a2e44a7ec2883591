use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Catalog entry advertised by a tool provider. Remote catalogs name the
/// schema field `inputSchema`, function-calling APIs name it `parameters`;
/// both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default = "empty_object_schema",
        alias = "inputSchema",
        alias = "input_schema"
    )]
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Checks parsed arguments against the parts of the schema that matter for
    /// dispatch: an object type and its `required` keys.
    pub fn check_arguments(&self, args: &Value) -> Result<(), String> {
        let expects_object = self.parameters.get("type").and_then(Value::as_str) == Some("object");
        if !expects_object {
            return Ok(());
        }

        let Some(object) = args.as_object() else {
            return Err(format!("expected a JSON object, got {}", type_name(args)));
        };

        let missing: Vec<&str> = self
            .parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|required| {
                required
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|key| !object.contains_key(*key))
                    .collect()
            })
            .unwrap_or_default();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("missing required field(s): {}", missing.join(", ")))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Outcome of one dispatched tool call. Failures are carried as text so the
/// model always gets an answer for every call it made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, error: &ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.to_string(),
            is_error: true,
        }
    }
}

/// An in-process function exposed to the model through a
/// [`LocalToolRegistry`](crate::tools::LocalToolRegistry).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> anyhow::Result<String>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            "GetCurrentTime",
            "Get the current time for a city",
            json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            }),
        )
    }

    #[test]
    fn descriptor_accepts_input_schema_field() {
        let descriptor: ToolDescriptor = serde_json::from_value(json!({
            "name": "GetCurrentTime",
            "description": "Get the current time for a city",
            "inputSchema": { "type": "object", "required": ["city"] }
        }))
        .unwrap();
        assert_eq!(descriptor.parameters["required"][0], "city");
    }

    #[test]
    fn descriptor_accepts_parameters_field() {
        let descriptor: ToolDescriptor = serde_json::from_value(json!({
            "name": "BookMeeting",
            "parameters": { "type": "object" }
        }))
        .unwrap();
        assert_eq!(descriptor.description, "");
        assert_eq!(descriptor.parameters["type"], "object");
    }

    #[test]
    fn check_arguments_reports_missing_required() {
        let err = time_descriptor().check_arguments(&json!({})).unwrap_err();
        assert!(err.contains("city"));
    }

    #[test]
    fn check_arguments_rejects_non_object() {
        let err = time_descriptor()
            .check_arguments(&json!(["Tokyo"]))
            .unwrap_err();
        assert!(err.contains("an array"));
    }

    #[test]
    fn check_arguments_passes_without_object_schema() {
        let descriptor = ToolDescriptor::new("echo", "", json!({}));
        assert!(descriptor.check_arguments(&json!("anything")).is_ok());
    }
}
