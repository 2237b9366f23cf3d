use std::path::{Path, PathBuf};
use std::time::Duration;

use advisor_wire::{
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_STREAM_PATH,
    DEFAULT_SUGGESTIONS_PATH, DEFAULT_SYNC_PATH, WireConfig,
};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SETTINGS_DIRECTORY_NAME: &str = "advisor";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "ADVISOR_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    #[serde(default = "default_sync_path")]
    pub sync_path: String,
    #[serde(default = "default_suggestions_path")]
    pub suggestions_path: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub extra_context: Map<String, Value>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            stream_path: default_stream_path(),
            sync_path: default_sync_path(),
            suggestions_path: default_suggestions_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            extra_context: Map::new(),
        }
    }
}

impl ClientSettings {
    pub fn normalized(mut self) -> Self {
        self.base_url = non_blank_or(self.base_url, default_base_url);
        self.api_key = self
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self.stream_path = non_blank_or(self.stream_path, default_stream_path);
        self.sync_path = non_blank_or(self.sync_path, default_sync_path);
        self.suggestions_path = non_blank_or(self.suggestions_path, default_suggestions_path);

        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }

        self
    }

    pub fn to_wire_config(&self) -> WireConfig {
        let config = WireConfig::new(&self.base_url)
            .with_paths(&self.stream_path, &self.sync_path, &self.suggestions_path)
            .with_timeouts(
                Duration::from_secs(self.connect_timeout_secs),
                Duration::from_secs(self.request_timeout_secs),
            );

        match &self.api_key {
            Some(api_key) => config.with_api_key(api_key),
            None => config,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".advisor"))
        .join(SETTINGS_FILE_NAME)
}

/// Defaults, then the JSON file when present, then `ADVISOR_*` variables.
pub fn load_settings(path: &Path) -> ClientSettings {
    if !path.exists() {
        tracing::info!(path = ?path, "settings file not found, using defaults and environment");
    }

    let figment = Figment::from(Serialized::defaults(ClientSettings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["extra_context"]));

    match figment.extract::<ClientSettings>() {
        Ok(settings) => settings.normalized(),
        Err(error) => {
            tracing::warn!(path = ?path, error = %error, "failed to parse settings, using defaults");
            ClientSettings::default()
        }
    }
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback()
    } else {
        value.to_string()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_stream_path() -> String {
    DEFAULT_STREAM_PATH.to_string()
}

fn default_sync_path() -> String {
    DEFAULT_SYNC_PATH.to_string()
}

fn default_suggestions_path() -> String {
    DEFAULT_SUGGESTIONS_PATH.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}
