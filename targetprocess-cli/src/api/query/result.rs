//! Query response parsing

use serde::Deserialize;
use serde_json::Value;

/// Collection response: `{"Items": [...], "Next": "<url>"}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(rename = "Items", default)]
    pub items: Vec<Value>,
    #[serde(rename = "Next", default)]
    pub next: Option<String>,
    #[serde(rename = "Prev", default)]
    pub prev: Option<String>,
}

impl QueryResponse {
    /// Accepts a collection envelope, a bare array, or a single entity
    pub fn from_value(value: Value) -> Self {
        let is_envelope = value.as_object().is_some_and(|obj| obj.contains_key("Items"));
        if is_envelope {
            return serde_json::from_value(value).unwrap_or_default();
        }

        match value {
            Value::Array(items) => Self {
                items,
                ..Self::default()
            },
            Value::Null => Self::default(),
            other => Self {
                items: vec![other],
                ..Self::default()
            },
        }
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}
