use serde_json::Value;

pub mod book_meeting;
pub mod current_time;
pub mod registry;

pub use book_meeting::BookMeetingTool;
pub use current_time::CurrentTimeTool;
pub use registry::LocalToolRegistry;

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}

/// Registry preloaded with the demo functions.
pub fn default_local_tools() -> LocalToolRegistry {
    let registry = LocalToolRegistry::new();
    registry.register(std::sync::Arc::new(CurrentTimeTool::new()));
    registry.register(std::sync::Arc::new(BookMeetingTool));
    registry
}
