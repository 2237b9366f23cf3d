use std::collections::HashSet;

use advisor_chat::{IntentProfile, Message, MessageId, ToolCallPart};

/// Echoes one assistant message; replaced text is rewritten on a fresh line.
#[derive(Debug, Default)]
pub struct StreamEcho {
    message_id: Option<MessageId>,
    printed: String,
    announced: HashSet<String>,
    resolved: HashSet<String>,
}

impl StreamEcho {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, message: &Message) -> String {
        if self.message_id != Some(message.id) {
            *self = Self {
                message_id: Some(message.id),
                ..Self::default()
            };
        }

        let mut output = String::new();
        let text = message.content.text();
        match text.strip_prefix(self.printed.as_str()) {
            Some(suffix) => output.push_str(suffix),
            None => {
                output.push('\n');
                output.push_str(&text);
            }
        }
        self.printed = text;

        for call in message.content.tool_calls() {
            let first_sight = self.announced.insert(call.tool_call_id.clone());
            let has_result = call.result.is_some();
            if (first_sight || has_result) && !self.resolved.contains(&call.tool_call_id) {
                output.push('\n');
                output.push_str(&tool_call_summary(call));
                output.push('\n');
                if has_result {
                    self.resolved.insert(call.tool_call_id.clone());
                }
            }
        }

        output
    }
}

pub fn tool_call_summary(call: &ToolCallPart) -> String {
    match &call.result {
        Some(result) => format!("[{} {}] {}", call.tool_name, call.tool_call_id, result),
        None => format!("[{} {}] running {}", call.tool_name, call.tool_call_id, call.args),
    }
}

pub fn profile_summary(profile: &IntentProfile) -> String {
    let mut fields = Vec::new();
    if let Some(risk) = &profile.risk_preference {
        fields.push(format!("risk: {risk}"));
    }
    if let Some(stage) = &profile.life_stage {
        fields.push(format!("life stage: {stage}"));
    }
    if !profile.goals.is_empty() {
        fields.push(format!("goals: {}", profile.goals.join(", ")));
    }
    if let Some(score) = profile.score() {
        fields.push(format!("intent: {score:.2}"));
    }
    if !profile.signals.is_empty() {
        fields.push(format!("signals: {}", profile.signals.len()));
    }
    if !profile.extra.is_empty() {
        let mut keys = profile.extra.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        fields.push(format!("other: {}", keys.join(", ")));
    }

    if fields.is_empty() {
        "profile: (empty)".to_string()
    } else {
        format!("profile: {}", fields.join(" | "))
    }
}
