//! Targetprocess type discovery models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a type check got its answer from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeSource {
    /// Types reported by the service's discovery endpoint
    Discovered,
    /// Built-in allow-list, used while discovery is unavailable
    Fallback,
}

/// Result of checking one entity type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCheck {
    pub valid: bool,
    pub source: TypeSource,
}

/// Lifecycle of the entity type cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Extract entity type names from a `/api/v1/Index/meta` response
///
/// Accepts `{"Items": [{"Name": ..}]}`, a bare array of names or `{Name}`
/// objects, and objects keyed by type name (top level or under `Items`).
pub fn parse_entity_types(response: &Value) -> Vec<String> {
    let body = match response.get("Items") {
        Some(items) => items,
        None => response,
    };

    let mut names: Vec<String> = match body {
        Value::Array(entries) => entries.iter().filter_map(entry_name).collect(),
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    names.retain(|name| !name.trim().is_empty());
    names.sort();
    names.dedup();
    names
}

fn entry_name(entry: &Value) -> Option<String> {
    match entry {
        Value::String(name) => Some(name.clone()),
        Value::Object(obj) => obj
            .get("Name")
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_items_of_named_objects() {
        let names = parse_entity_types(&json!({
            "Items": [{"Name": "UserStory"}, {"Name": "Bug"}, {"Name": "Bug"}, {"Other": 1}]
        }));
        assert_eq!(names, vec!["Bug", "UserStory"]);
    }

    #[test]
    fn test_bare_array_of_strings() {
        assert_eq!(parse_entity_types(&json!(["Task", "", "Epic"])), vec!["Epic", "Task"]);
    }

    #[test]
    fn test_object_keyed_by_type() {
        let names = parse_entity_types(&json!({"Items": {"Feature": {}, "Team": {}}}));
        assert_eq!(names, vec!["Feature", "Team"]);

        let names = parse_entity_types(&json!({"Project": {}}));
        assert_eq!(names, vec!["Project"]);
    }

    #[test]
    fn test_unexpected_shape_is_empty() {
        assert!(parse_entity_types(&json!(42)).is_empty());
    }
}
