use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::MessageId;

/// Tool name assumed when a tool-call entry arrives without one.
pub const DEFAULT_TOOL_NAME: &str = "product_recommendation";

pub const SERVER_ERROR_REPLY: &str =
    "Sorry, something went wrong while preparing your answer. Please try again.";

pub const CONNECTIVITY_ERROR_REPLY: &str =
    "I couldn't reach the advisory service. Please check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: Value,
    pub result: Option<Value>,
}

impl ToolCallPart {
    pub fn new(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args: Value::Object(Map::new()),
            result: None,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    /// Folds a later entry for the same call into this one. Position and name are kept.
    pub fn absorb(&mut self, later: ToolCallPart) {
        if later.result.is_some() {
            self.result = later.result;
        }
        if !is_empty_args(&later.args) {
            self.args = later.args;
        }
    }
}

fn is_empty_args(args: &Value) -> bool {
    match args {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text { text: String },
    ToolCall(ToolCallPart),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Content {
    pub fn with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCallPart>) -> Self {
        let mut parts = Vec::with_capacity(tool_calls.len() + 1);
        parts.push(ContentPart::Text { text: text.into() });
        parts.extend(tool_calls.into_iter().map(ContentPart::ToolCall));
        Self::Parts(parts)
    }

    pub fn parts(&self) -> Vec<ContentPart> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![ContentPart::Text { text: text.clone() }],
            Self::Parts(parts) => parts.clone(),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ToolCall(_) => None,
                })
                .collect(),
        }
    }

    pub fn tool_calls(&self) -> Vec<&ToolCallPart> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ToolCall(tool_call) => Some(tool_call),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Parts(parts) => parts.iter().all(|part| match part {
                ContentPart::Text { text } => text.is_empty(),
                ContentPart::ToolCall(_) => false,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: Content,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: Content) -> Self {
        Self {
            id: MessageId::new_v7(),
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::Text(text.into()))
    }

    pub fn assistant_placeholder() -> Self {
        Self::new(Role::Assistant, Content::default())
    }
}
