use serde_json::{Map, Value};

use super::message::{DEFAULT_TOOL_NAME, ToolCallPart};
use super::profile::IntentProfile;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignal {
    /// Cumulative assistant text; replaces what was shown before.
    TextDelta(String),
    ProfileUpdate(IntentProfile),
    ToolCall(ToolCallPart),
    Error(String),
    Finish,
}

/// Classifies one parsed record into the signals it carries.
///
/// Signals come out as text, profile, tool calls in array order, then error.
/// Records that are not JSON objects carry nothing.
pub fn interpret(record: &Value) -> Vec<StreamSignal> {
    let Some(fields) = record.as_object() else {
        return Vec::new();
    };

    let mut signals = Vec::new();

    if let Some(text) = fields.get("response").and_then(Value::as_str) {
        signals.push(StreamSignal::TextDelta(text.to_string()));
    }

    if let Some(profile) = fields.get("intent_profile").and_then(IntentProfile::from_value) {
        signals.push(StreamSignal::ProfileUpdate(profile));
    }

    if let Some(entries) = fields.get("tool_calls").and_then(Value::as_array) {
        signals.extend(
            entries
                .iter()
                .filter_map(tool_call_from_entry)
                .map(StreamSignal::ToolCall),
        );
    }

    if let Some(message) = error_message(fields) {
        signals.push(StreamSignal::Error(message));
    }

    signals
}

fn tool_call_from_entry(entry: &Value) -> Option<ToolCallPart> {
    let Some(tool_call_id) = entry.get("tool_call_id").and_then(Value::as_str) else {
        tracing::warn!(
            stage = "interpret-tool-call",
            entry = %entry,
            "skipping tool call without an id"
        );
        return None;
    };

    let tool_name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_TOOL_NAME);

    let args = match entry.get("args") {
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(args) => args.clone(),
    };

    let mut part = ToolCallPart::new(tool_call_id, tool_name).with_args(args);
    if let Some(result) = entry.get("result").filter(|result| !result.is_null()) {
        part = part.with_result(result.clone());
    }
    Some(part)
}

fn error_message(fields: &Map<String, Value>) -> Option<String> {
    match fields.get("error")? {
        Value::Null => None,
        Value::String(message) if message.is_empty() => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_with_several_fields_dispatches_all_in_order() {
        let signals = interpret(&json!({
            "error": "late failure",
            "tool_calls": [
                {"tool_call_id": "t1", "name": "fund_screen", "args": {"risk": "low"}, "result": [1, 2]},
                {"tool_call_id": "t2", "result": null}
            ],
            "intent_profile": {"life_stage": "retired"},
            "response": "Here are two funds"
        }));

        assert_eq!(signals.len(), 5);
        assert_eq!(signals[0], StreamSignal::TextDelta("Here are two funds".to_string()));
        assert!(matches!(&signals[1], StreamSignal::ProfileUpdate(profile) if profile.life_stage.as_deref() == Some("retired")));
        assert_eq!(
            signals[2],
            StreamSignal::ToolCall(
                ToolCallPart::new("t1", "fund_screen")
                    .with_args(json!({"risk": "low"}))
                    .with_result(json!([1, 2]))
            )
        );
        assert_eq!(
            signals[3],
            StreamSignal::ToolCall(ToolCallPart::new("t2", DEFAULT_TOOL_NAME))
        );
        assert_eq!(signals[4], StreamSignal::Error("late failure".to_string()));
    }

    #[test]
    fn empty_and_foreign_fields_carry_nothing() {
        assert!(interpret(&json!({"tool_calls": [], "error": "", "heartbeat": true})).is_empty());
        assert!(interpret(&json!([1, 2, 3])).is_empty());
        assert!(interpret(&json!({"response": 42})).is_empty());
    }

    #[test]
    fn tool_call_without_id_is_skipped() {
        let signals = interpret(&json!({"tool_calls": [{"name": "x"}, {"tool_call_id": "ok"}]}));
        assert_eq!(signals.len(), 1);
        assert!(matches!(&signals[0], StreamSignal::ToolCall(call) if call.tool_call_id == "ok"));
    }

    #[test]
    fn empty_response_is_still_a_replacement() {
        assert_eq!(
            interpret(&json!({"response": ""})),
            vec![StreamSignal::TextDelta(String::new())]
        );
    }
}
