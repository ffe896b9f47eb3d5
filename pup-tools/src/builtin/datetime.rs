//! Current date/time capability.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Utc};
use serde_json::{json, Map, Value};

use pup_core::tool::{ParamSpec, ParamType, ToolCapability, ToolExecutionError};

pub struct GetDateTimeTool;

#[async_trait]
impl ToolCapability for GetDateTimeTool {
    fn name(&self) -> &str {
        "get_datetime"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::optional(
                "format",
                ParamType::Enum(vec![
                    "full".into(),
                    "date".into(),
                    "time".into(),
                    "simple".into(),
                ]),
                "Output format: full, date, time, or simple",
            )
            .with_default(json!("full")),
            ParamSpec::optional(
                "timezone",
                ParamType::String,
                "Timezone: 'UTC' or a fixed offset like '+05:30'. Defaults to local time",
            ),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ToolExecutionError> {
        let format = arguments
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("full");

        match arguments.get("timezone").and_then(Value::as_str) {
            None => Ok(render(Local::now(), format)),
            Some(tz) => {
                let offset = parse_timezone(tz)?;
                Ok(render(Utc::now().with_timezone(&offset), format))
            }
        }
    }
}

fn parse_timezone(tz: &str) -> Result<FixedOffset, ToolExecutionError> {
    match tz.trim() {
        "UTC" | "utc" | "Z" => Ok(Utc.fix()),
        other => other.parse::<FixedOffset>().map_err(|_| {
            ToolExecutionError::new(format!(
                "unrecognized timezone '{other}'; use 'UTC' or a fixed offset like '+05:30'"
            ))
        }),
    }
}

fn render<Tz: TimeZone>(now: DateTime<Tz>, format: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let pattern = match format {
        "date" => "%Y-%m-%d",
        "time" => "%H:%M:%S",
        "simple" => "%b %d, %Y %I:%M %p",
        _ => "%A, %B %d, %Y %H:%M:%S",
    };
    now.format(pattern).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn date_format_is_iso_shaped() {
        let out = GetDateTimeTool
            .execute(args(json!({ "format": "date", "timezone": "UTC" })))
            .await
            .unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out.matches('-').count(), 2);
    }

    #[tokio::test]
    async fn fixed_offset_timezone_is_accepted() {
        let out = GetDateTimeTool
            .execute(args(json!({ "format": "time", "timezone": "+05:30" })))
            .await
            .unwrap();
        assert_eq!(out.matches(':').count(), 2);
    }

    #[tokio::test]
    async fn bogus_timezone_is_an_execution_error() {
        let err = GetDateTimeTool
            .execute(args(json!({ "timezone": "Mars/Olympus" })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unrecognized timezone"));
    }
}
