use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::message::{ContentPart, Message, Role};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub role: Role,
    pub content: Vec<PartView>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PartView {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        args: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
}

impl From<ContentPart> for PartView {
    fn from(part: ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self::Text { text },
            ContentPart::ToolCall(call) => Self::ToolCall {
                tool_call_id: call.tool_call_id,
                tool_name: call.tool_name,
                args: call.args,
                result: call.result,
            },
        }
    }
}

pub fn to_view(message: &Message) -> MessageView {
    MessageView {
        id: message.id.to_string(),
        role: message.role,
        content: message
            .content
            .parts()
            .into_iter()
            .map(PartView::from)
            .collect(),
        created_at: message.created_at,
    }
}
