use crate::tools::extract_string_arg;
use crate::traits::Tool;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local};
use serde_json::json;

/// Reports the host's local clock and asks the model to convert it to the
/// requested city's offset itself.
pub struct CurrentTimeTool {
    clock: fn() -> DateTime<FixedOffset>,
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self {
            clock: || Local::now().fixed_offset(),
        }
    }

    pub fn with_clock(clock: fn() -> DateTime<FixedOffset>) -> Self {
        Self { clock }
    }
}

fn describe(now: DateTime<FixedOffset>, city: &str) -> String {
    let offset = now.format("%:z");
    format!(
        "The current local time is {} on {} (UTC{}). To provide the local time for {}, \
         convert this time from UTC{} to the UTC offset of {} before answering.",
        now.format("%H:%M"),
        now.format("%d/%m/%Y"),
        offset,
        city,
        offset,
        city
    )
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "GetCurrentTime"
    }

    fn description(&self) -> &str {
        "Get the current time for a city"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "The city to get the local time for"
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<String> {
        let city = extract_string_arg(&args, "city")?;
        Ok(describe((self.clock)(), &city))
    }
}
