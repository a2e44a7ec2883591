use crate::error::ToolError;
use crate::traits::{Tool, ToolDescriptor, ToolProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-process functions keyed by name, exposed as one [`ToolProvider`].
pub struct LocalToolRegistry {
    name: String,
    tools: Mutex<Vec<Arc<dyn Tool>>>,
}

impl Default for LocalToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalToolRegistry {
    pub fn new() -> Self {
        Self::named("local")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Tool>>> {
        self.tools.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a tool. A tool already registered under the same name is
    /// replaced in place.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let mut tools = self.lock();
        match tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => {
                tracing::warn!(tool = tool.name(), registry = %self.name, "Replacing registered tool");
                tools[idx] = tool;
            }
            None => tools.push(tool),
        }
    }

    pub fn with_tool(self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.lock().iter().find(|t| t.name() == name).cloned()
    }
}

#[async_trait]
impl ToolProvider for LocalToolRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(self.lock().iter().map(|t| t.descriptor()).collect())
    }

    async fn invoke(&self, tool_name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        tool.execute(args)
            .await
            .map_err(|e| ToolError::execution(tool_name, format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }

        async fn execute(&self, args: Value) -> anyhow::Result<String> {
            match args.get("fail") {
                Some(_) => anyhow::bail!("asked to fail"),
                None => Ok(args.to_string()),
            }
        }
    }

    #[tokio::test]
    async fn lists_tools_in_registration_order() {
        let registry = LocalToolRegistry::new()
            .with_tool(Arc::new(Echo("b")))
            .with_tool(Arc::new(Echo("a")));

        let names: Vec<String> = registry
            .list_tools()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn register_replaces_same_name() {
        let registry = LocalToolRegistry::new();
        registry.register(Arc::new(Echo("echo")));
        registry.register(Arc::new(Echo("echo")));
        assert_eq!(registry.list_tools().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_not_found() {
        let registry = LocalToolRegistry::new();
        let err = registry.invoke("missing", json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn invoke_maps_failure_to_execution_error() {
        let registry = LocalToolRegistry::new().with_tool(Arc::new(Echo("echo")));
        let err = registry
            .invoke("echo", json!({ "fail": true }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution { ref name, .. } if name == "echo"));
        assert!(err.to_string().contains("asked to fail"));
    }
}
