//! Argument extraction helpers shared by the tool implementations.

use chrono::{DateTime, Utc};
use serde_json::Value;

use deploywatch_core::{ToolError, ToolResult};

/// A required string argument.
pub fn required_str<'a>(args: &'a Value, name: &str) -> ToolResult<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing required argument '{name}'")))
}

/// An optional string argument, `None` when absent or empty.
pub fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// An optional non-negative integer argument with a default.
pub fn int_or(args: &Value, name: &str, default: u64) -> u64 {
    args.get(name).and_then(Value::as_u64).unwrap_or(default)
}

/// An optional RFC 3339 timestamp argument.
pub fn optional_timestamp(args: &Value, name: &str) -> ToolResult<Option<DateTime<Utc>>> {
    match optional_str(args, name) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| {
                ToolError::InvalidArguments(format!("'{name}' is not an RFC 3339 timestamp: {e}"))
            }),
    }
}
