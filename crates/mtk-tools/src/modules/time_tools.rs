//! Time module: current time and conversion between fixed UTC offsets.

use crate::params::{parse_args, schema_of};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime, SecondsFormat, TimeZone, Utc};
use mtk_host::{CallContext, Operation, OperationError, OperationMap, OperationOutput};
use mtk_registry::Capability;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Capability type for the `time_tools` module.
#[derive(Debug, Default)]
pub struct TimeTools;

impl Capability for TimeTools {
    fn name(&self) -> &str {
        "Time Tools"
    }

    fn description(&self) -> &str {
        "Get the current time at a UTC offset and convert times between offsets"
    }

    fn operations(&self) -> OperationMap {
        let mut ops = OperationMap::new();
        ops.insert("get_current_time".to_string(), Arc::new(GetCurrentTime));
        ops.insert("convert_time".to_string(), Arc::new(ConvertTime));
        ops
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["chrono".to_string()]
    }
}

/// Parse `UTC`, `Z`, `+05:30`, `-0800`, `+3` or `UTC-03:30` into an offset.
pub fn parse_offset(raw: &str) -> Result<FixedOffset, OperationError> {
    let invalid = || OperationError::InvalidParameters(format!("Invalid UTC offset: '{raw}'"));
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("UTC")
        .or_else(|| trimmed.strip_prefix("GMT"))
        .unwrap_or(trimmed);
    if body.is_empty() || body == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, digits) = match body.as_bytes()[0] {
        b'+' => (1, &body[1..]),
        b'-' => (-1, &body[1..]),
        _ => return Err(invalid()),
    };
    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return Err(invalid());
    }
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// `+1.0h`, `-3.5h`, `+5.75h`
fn format_difference(seconds: i32) -> String {
    let hours = f64::from(seconds) / 3600.0;
    if hours.fract() == 0.0 {
        format!("{hours:+.1}h")
    } else {
        let text = format!("{hours:+.2}");
        format!("{}h", text.trim_end_matches('0').trim_end_matches('.'))
    }
}

fn time_result(offset: &str, time: &DateTime<FixedOffset>) -> serde_json::Value {
    serde_json::json!({
        "utc_offset": offset,
        "datetime": time.to_rfc3339_opts(SecondsFormat::Secs, false),
    })
}

// -- get_current_time --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetCurrentTimeParams {
    /// UTC offset such as `+05:30`, `-08:00` or `UTC`. Default: UTC.
    #[serde(default)]
    pub utc_offset: Option<String>,
}

struct GetCurrentTime;

#[async_trait]
impl Operation for GetCurrentTime {
    fn description(&self) -> &str {
        "Get the current time at a UTC offset"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<GetCurrentTimeParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: GetCurrentTimeParams = parse_args(args)?;
        let label = params.utc_offset.unwrap_or_else(|| "UTC".to_string());
        let offset = parse_offset(&label)?;
        let now = Utc::now().with_timezone(&offset);
        Ok(OperationOutput::json(time_result(&label, &now)))
    }
}

// -- convert_time --

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ConvertTimeParams {
    /// Source UTC offset, e.g. `-05:00`.
    pub source_offset: String,
    /// Time in 24-hour `HH:MM` format, interpreted today at the source offset.
    pub time: String,
    /// Target UTC offset, e.g. `+01:00`.
    pub target_offset: String,
}

struct ConvertTime;

impl ConvertTime {
    fn convert(
        params: &ConvertTimeParams,
        today: DateTime<Utc>,
    ) -> Result<serde_json::Value, OperationError> {
        let source = parse_offset(&params.source_offset)?;
        let target = parse_offset(&params.target_offset)?;
        let time = NaiveTime::parse_from_str(params.time.trim(), "%H:%M").map_err(|_| {
            OperationError::InvalidParameters("Invalid time format. Expected HH:MM (24-hour)".to_string())
        })?;

        let date = today.with_timezone(&source).date_naive();
        let source_time = source
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or_else(|| OperationError::ExecutionError("Ambiguous local time".to_string()))?;
        let target_time = source_time.with_timezone(&target);
        let difference = target.local_minus_utc() - source.local_minus_utc();

        Ok(serde_json::json!({
            "source": time_result(&params.source_offset, &source_time),
            "target": time_result(&params.target_offset, &target_time),
            "time_difference": format_difference(difference),
        }))
    }
}

#[async_trait]
impl Operation for ConvertTime {
    fn description(&self) -> &str {
        "Convert a time of day from one UTC offset to another"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<ConvertTimeParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: ConvertTimeParams = parse_args(args)?;
        Ok(OperationOutput::json(Self::convert(&params, Utc::now())?))
    }
}
