use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STREAM_PATH: &str = "/api/chat/stream";
pub const DEFAULT_SYNC_PATH: &str = "/api/chat";
pub const DEFAULT_SUGGESTIONS_PATH: &str = "/api/suggestions";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Body keys owned by the request itself; extra context may not shadow them.
const RESERVED_BODY_KEYS: [&str; 4] = [
    "message",
    "session_id",
    "conversation_history",
    "intent_profile",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub stream_path: String,
    pub sync_path: String,
    pub suggestions_path: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl WireConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().to_string(),
            api_key: None,
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            sync_path: DEFAULT_SYNC_PATH.to_string(),
            suggestions_path: DEFAULT_SUGGESTIONS_PATH.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into().trim().to_string();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    pub fn with_paths(
        mut self,
        stream_path: impl Into<String>,
        sync_path: impl Into<String>,
        suggestions_path: impl Into<String>,
    ) -> Self {
        self.stream_path = stream_path.into();
        self.sync_path = sync_path.into();
        self.suggestions_path = suggestions_path.into();
        self
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, request_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: HistoryRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamRequest {
    pub message: String,
    pub session_id: String,
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_profile: Option<Value>,
    #[serde(flatten)]
    pub extra_context: Map<String, Value>,
}

impl StreamRequest {
    pub fn new(
        message: impl Into<String>,
        session_id: impl Into<String>,
        conversation_history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            conversation_history,
            intent_profile: None,
            extra_context: Map::new(),
        }
    }

    pub fn with_intent_profile(mut self, intent_profile: Option<Value>) -> Self {
        self.intent_profile = intent_profile;
        self
    }

    pub fn with_extra_context(mut self, extra_context: Map<String, Value>) -> Self {
        self.extra_context = extra_context
            .into_iter()
            .filter(|(key, _)| !RESERVED_BODY_KEYS.contains(&key.as_str()))
            .collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRequest {
    pub message: String,
    pub session_id: String,
    pub conversation_history: Vec<HistoryEntry>,
}

impl SyncRequest {
    pub fn new(
        message: impl Into<String>,
        session_id: impl Into<String>,
        conversation_history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            conversation_history,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub intent_profile: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub category: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {other}"
        ))),
    }
}
