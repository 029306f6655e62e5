//! Current time built-in tool.

use crate::tools::function::decode_args;
use crate::tools::{
    InputSchema, Latency, ParamSchema, ToolDescriptor, ToolError, ToolFuture, ToolHandler,
    ToolMetadata, ToolOutput,
};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Display;

const TOOL_NAME: &str = "get_current_time";

/// Current time tool.
///
/// Returns the current time as an ISO 8601 string, a readable
/// `YYYY-MM-DD HH:MM:SS` string, or a Unix timestamp string.
#[derive(Debug, Default, Clone)]
pub struct GetCurrentTimeTool;

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TimeFormat {
    Iso,
    #[default]
    Readable,
    Timestamp,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Zone {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Deserialize)]
struct TimeArgs {
    #[serde(default)]
    timezone: Zone,
    #[serde(default)]
    format: TimeFormat,
}

impl GetCurrentTimeTool {
    /// Creates a new time tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            TOOL_NAME,
            "Get the current date and time",
            InputSchema::new()
                .optional_param(
                    "timezone",
                    ParamSchema::string("Timezone (local or utc)")
                        .with_enum(["local", "utc"])
                        .with_default("local"),
                )
                .optional_param(
                    "format",
                    ParamSchema::string("Time format (iso, readable, timestamp)")
                        .with_enum(["iso", "readable", "timestamp"])
                        .with_default("readable"),
                ),
        )
        .with_metadata(
            ToolMetadata::new()
                .with_category("datetime")
                .with_cost(0.0)
                .with_latency(Latency::Low),
        )
    }
}

fn render<Tz>(now: DateTime<Tz>, format: TimeFormat) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match format {
        TimeFormat::Iso => now.to_rfc3339(),
        TimeFormat::Readable => now.format("%Y-%m-%d %H:%M:%S").to_string(),
        TimeFormat::Timestamp => now.timestamp().to_string(),
    }
}

impl ToolHandler for GetCurrentTimeTool {
    fn call(&self, args: Value) -> ToolFuture {
        Box::pin(async move {
            let args: TimeArgs = decode_args(TOOL_NAME, args)?;
            let text = match args.timezone {
                Zone::Local => render(Local::now(), args.format),
                Zone::Utc => render(Utc::now(), args.format),
            };
            Ok::<_, ToolError>(ToolOutput::new(Value::String(text)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn now(args: Value) -> String {
        let output = GetCurrentTimeTool::new().call(args).await.unwrap();
        output.value.as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn readable_is_default() {
        let text = now(json!({})).await;
        assert!(chrono::NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[tokio::test]
    async fn iso_parses_as_rfc3339() {
        let text = now(json!({"format": "iso", "timezone": "utc"})).await;
        assert!(DateTime::parse_from_rfc3339(&text).is_ok());
    }

    #[tokio::test]
    async fn timestamp_is_current() {
        let text = now(json!({"format": "timestamp"})).await;
        let seconds: i64 = text.parse().unwrap();
        assert!((Utc::now().timestamp() - seconds).abs() < 5);
    }

    #[tokio::test]
    async fn unknown_format_rejected() {
        let err = GetCurrentTimeTool::new()
            .call(json!({"format": "julian"}))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn descriptor_constrains_format() {
        let descriptor = GetCurrentTimeTool::descriptor();
        assert!(descriptor.input_schema.required.is_empty());
        assert_eq!(
            descriptor.input_schema.properties["format"]
                .allowed
                .as_ref()
                .map(Vec::len),
            Some(3)
        );
    }
}
