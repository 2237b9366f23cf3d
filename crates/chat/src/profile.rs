use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-maintained advisory state about the user.
///
/// Always replaced as a whole; the client never merges individual fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_stage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<SignalObservation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    // Object exactly as the server sent it; echoed back untouched.
    #[serde(skip)]
    pub(crate) wire: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalObservation {
    #[serde(default)]
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IntentProfile {
    /// Reads a profile object from the wire. Non-objects yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let mut profile = match serde_json::from_value::<IntentProfile>(value.clone()) {
            Ok(profile) => profile,
            Err(error) => {
                tracing::warn!(
                    stage = "decode-intent-profile",
                    error = %error,
                    "intent profile has unexpected field shapes; keeping it untyped"
                );
                Self {
                    extra: object.clone(),
                    ..Self::default()
                }
            }
        };
        profile.wire = Some(object.clone());
        Some(profile)
    }

    pub fn to_value(&self) -> Value {
        match &self.wire {
            Some(object) => Value::Object(object.clone()),
            None => serde_json::to_value(self).unwrap_or(Value::Null),
        }
    }

    /// Intent score limited to `[0, 1]`; non-finite scores read as absent.
    pub fn score(&self) -> Option<f64> {
        self.intent_score
            .filter(|score| score.is_finite())
            .map(|score| score.clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileHandle {
    current: Arc<ArcSwapOption<IntentProfile>>,
}

impl ProfileHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: IntentProfile) -> Self {
        let handle = Self::new();
        handle.replace(profile);
        handle
    }

    pub fn current(&self) -> Option<Arc<IntentProfile>> {
        self.current.load_full()
    }

    pub fn replace(&self, profile: IntentProfile) {
        self.current.store(Some(Arc::new(profile)));
    }
}
