//! Model-facing tool surface.
//!
//! Each active persona exposes a fixed set of named tools. The reply model
//! picks one by name and supplies JSON arguments; [`ToolCall::parse`] turns
//! that into a typed request for the persona to execute.

pub mod time;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

pub const END_CONVERSATION: &str = "end_conversation";
pub const GET_CURRENT_TIME: &str = "get_current_time";
pub const CONVERT_TIME: &str = "convert_time";

const HANDOFF_PREFIX: &str = "call_";
const HANDOFF_SUFFIX: &str = "_agent";

/// Name of the tool that hands off to `target_id`
pub fn handoff_tool_name(target_id: &str) -> String {
    format!("{}{}{}", HANDOFF_PREFIX, target_id, HANDOFF_SUFFIX)
}

// ─────────────────────────────────────────────────────────────────
// Tool Specs
// ─────────────────────────────────────────────────────────────────

/// Declaration of one callable tool, parameters as JSON schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    /// Handoff tool; `payload` is the single string argument, if any
    pub fn handoff(target_id: &str, description: String, payload: Option<(&str, &str)>) -> Self {
        let parameters = match payload {
            Some((key, about)) => {
                let mut properties = Map::new();
                properties.insert(
                    key.to_string(),
                    json!({ "type": "string", "description": about }),
                );
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": [key],
                })
            }
            None => json!({ "type": "object", "properties": {} }),
        };
        Self {
            name: handoff_tool_name(target_id),
            description,
            parameters,
        }
    }

    pub fn end_conversation() -> Self {
        Self {
            name: END_CONVERSATION.to_string(),
            description: "End the conversation, say goodbye and hang up".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    pub fn current_time() -> Self {
        Self {
            name: GET_CURRENT_TIME.to_string(),
            description: "Get the current time in a timezone".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "timezone": {
                        "type": "string",
                        "description": "IANA timezone name, defaults to the session timezone"
                    }
                },
            }),
        }
    }

    pub fn convert_time() -> Self {
        Self {
            name: CONVERT_TIME.to_string(),
            description: "Convert a local time from one timezone to another".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "time": { "type": "string", "description": "Local time as YYYY-MM-DD HH:MM" },
                    "from_timezone": { "type": "string", "description": "IANA timezone of the given time" },
                    "to_timezone": { "type": "string", "description": "IANA timezone to convert to" }
                },
                "required": ["time", "from_timezone", "to_timezone"],
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tool Calls
// ─────────────────────────────────────────────────────────────────

/// A parsed tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// `call_<target>_agent`
    Handoff {
        target: String,
        payload: BTreeMap<String, String>,
    },
    CurrentTime {
        timezone: Option<String>,
    },
    ConvertTime {
        time: String,
        from_timezone: String,
        to_timezone: String,
    },
    EndConversation,
}

impl ToolCall {
    /// Parse a tool name and its JSON arguments
    pub fn parse(name: &str, args: &Value) -> Result<Self> {
        let fields = string_fields(name, args)?;

        match name {
            END_CONVERSATION => Ok(ToolCall::EndConversation),
            GET_CURRENT_TIME => Ok(ToolCall::CurrentTime {
                timezone: fields.get("timezone").cloned(),
            }),
            CONVERT_TIME => Ok(ToolCall::ConvertTime {
                time: required(name, &fields, "time")?,
                from_timezone: required(name, &fields, "from_timezone")?,
                to_timezone: required(name, &fields, "to_timezone")?,
            }),
            _ => {
                let target = name
                    .strip_prefix(HANDOFF_PREFIX)
                    .and_then(|rest| rest.strip_suffix(HANDOFF_SUFFIX))
                    .ok_or_else(|| Error::ToolUnknown {
                        name: name.to_string(),
                    })?;
                Ok(ToolCall::Handoff {
                    target: target.to_string(),
                    payload: fields,
                })
            }
        }
    }

    /// Tool name this call was made through
    pub fn name(&self) -> String {
        match self {
            ToolCall::Handoff { target, .. } => handoff_tool_name(target),
            ToolCall::CurrentTime { .. } => GET_CURRENT_TIME.to_string(),
            ToolCall::ConvertTime { .. } => CONVERT_TIME.to_string(),
            ToolCall::EndConversation => END_CONVERSATION.to_string(),
        }
    }
}

/// Flatten a JSON object of scalars into string fields
fn string_fields(tool: &str, args: &Value) -> Result<BTreeMap<String, String>> {
    let empty = Map::new();
    let object = match args {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(Error::tool_arguments(
                tool,
                format!("expected a JSON object, got {}", other),
            ))
        }
    };

    let mut fields = BTreeMap::new();
    for (key, value) in object {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::tool_arguments(
                    tool,
                    format!("argument '{}' must be a string", key),
                ))
            }
        };
        fields.insert(key.clone(), text);
    }
    Ok(fields)
}

fn required(tool: &str, fields: &BTreeMap<String, String>, key: &str) -> Result<String> {
    fields
        .get(key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| Error::tool_arguments(tool, format!("missing argument '{}'", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_handoff_with_topic() {
        let call = ToolCall::parse("call_support_agent", &json!({"topic": "printer jam"})).unwrap();
        match call {
            ToolCall::Handoff { target, payload } => {
                assert_eq!(target, "support");
                assert_eq!(payload.get("topic").map(String::as_str), Some("printer jam"));
            }
            other => panic!("Expected Handoff, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_return_without_args() {
        let call = ToolCall::parse("call_starter_agent", &Value::Null).unwrap();
        assert_eq!(
            call,
            ToolCall::Handoff {
                target: "starter".into(),
                payload: BTreeMap::new()
            }
        );
        assert_eq!(call.name(), "call_starter_agent");
    }

    #[test]
    fn test_parse_handoff_with_underscored_id() {
        let call = ToolCall::parse("call_tier_two_agent", &json!({})).unwrap();
        assert!(matches!(call, ToolCall::Handoff { ref target, .. } if target == "tier_two"));
    }

    #[test]
    fn test_parse_time_tools() {
        let call = ToolCall::parse(GET_CURRENT_TIME, &json!({})).unwrap();
        assert_eq!(call, ToolCall::CurrentTime { timezone: None });

        let call = ToolCall::parse(
            CONVERT_TIME,
            &json!({"time": "2024-07-01 09:30", "from_timezone": "UTC", "to_timezone": "Asia/Tokyo"}),
        )
        .unwrap();
        assert!(matches!(call, ToolCall::ConvertTime { .. }));
    }

    #[test]
    fn test_parse_convert_time_missing_argument() {
        let err = ToolCall::parse(CONVERT_TIME, &json!({"time": "2024-07-01 09:30"})).unwrap_err();
        assert_eq!(err.kind(), "ToolArguments");
    }

    #[test]
    fn test_parse_unknown_tool() {
        let err = ToolCall::parse("order_pizza", &json!({})).unwrap_err();
        assert_eq!(err.kind(), "ToolUnknown");
    }

    #[test]
    fn test_parse_rejects_non_object_args() {
        let err = ToolCall::parse(END_CONVERSATION, &json!(["x"])).unwrap_err();
        assert_eq!(err.kind(), "ToolArguments");
    }

    #[test]
    fn test_handoff_spec_parameters() {
        let spec = ToolSpec::handoff("support", "Technical issue".into(), Some(("topic", "The issue")));
        assert_eq!(spec.name, "call_support_agent");
        assert_eq!(spec.parameters["required"][0], "topic");

        let spec = ToolSpec::handoff("starter", "Back to Tom".into(), None);
        assert!(spec.parameters.get("required").is_none());
    }
}
