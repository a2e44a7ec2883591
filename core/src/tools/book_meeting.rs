use crate::tools::extract_string_arg;
use crate::traits::Tool;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde_json::json;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Demo booking function. Nothing is persisted; it only confirms the slot.
pub struct BookMeetingTool;

fn parse_meeting_time(raw: &str) -> anyhow::Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| {
            anyhow!(
                "Unrecognized meetingDateTime '{}', expected YYYY-MM-DD HH:MM",
                raw
            )
        })
}

#[async_trait]
impl Tool for BookMeetingTool {
    fn name(&self) -> &str {
        "BookMeeting"
    }

    fn description(&self) -> &str {
        "book a meeting in the city, datetime and agenda"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string" },
                "meetingDateTime": {
                    "type": "string",
                    "description": "Meeting start, e.g. 2025-03-14 15:00"
                },
                "agenda": { "type": "string" }
            },
            "required": ["city", "meetingDateTime", "agenda"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<String> {
        let city = extract_string_arg(&args, "city")?;
        let when = parse_meeting_time(&extract_string_arg(&args, "meetingDateTime")?)?;
        let agenda = extract_string_arg(&args, "agenda")?;

        let result = format!(
            "Meeting Room R1 booked in {} at {} with agenda: {}",
            city,
            when.format("%Y-%m-%d %H:%M"),
            agenda
        );
        tracing::info!(%city, %when, "Meeting booked");
        Ok(result)
    }
}
