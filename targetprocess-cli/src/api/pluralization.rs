//! Entity type to REST collection name conversion for the Targetprocess API

/// Convert a PascalCase entity type to its `/api/v1/` collection name
///
/// Targetprocess only applies the simple English rules: `es` after sibilants,
/// `ies` after consonant + `y`, otherwise `s`. Names that already look plural
/// are returned unchanged so callers may pass either form.
pub fn collection_name(entity_type: &str) -> String {
    if entity_type.is_empty() {
        return entity_type.to_string();
    }

    if is_already_plural(entity_type) {
        return entity_type.to_string();
    }

    let lower = entity_type.to_lowercase();

    if lower.ends_with('s') || lower.ends_with("sh") || lower.ends_with("ch") || lower.ends_with('x')
    {
        return format!("{}es", entity_type);
    }

    if lower.ends_with('y') {
        let before_y = lower.chars().rev().nth(1);
        if let Some(c) = before_y {
            if !"aeiou".contains(c) {
                return format!("{}ies", &entity_type[..entity_type.len() - 1]);
            }
        }
    }

    format!("{}s", entity_type)
}

fn is_already_plural(entity_type: &str) -> bool {
    entity_type.ends_with("ies") || entity_type.ends_with("sses")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_collections() {
        assert_eq!(collection_name("Bug"), "Bugs");
        assert_eq!(collection_name("Task"), "Tasks");
        assert_eq!(collection_name("Feature"), "Features");
        assert_eq!(collection_name("Time"), "Times");
        assert_eq!(collection_name("Release"), "Releases");
        assert_eq!(collection_name("Day"), "Days");
    }

    #[test]
    fn test_consonant_y_endings() {
        assert_eq!(collection_name("UserStory"), "UserStories");
        assert_eq!(collection_name("Priority"), "Priorities");
        assert_eq!(collection_name("Severity"), "Severities");
    }

    #[test]
    fn test_sibilant_endings() {
        assert_eq!(collection_name("Process"), "Processes");
        assert_eq!(collection_name("Status"), "Statuses");
        assert_eq!(collection_name("Branch"), "Branches");
    }

    #[test]
    fn test_already_plural_passthrough() {
        assert_eq!(collection_name("UserStories"), "UserStories");
        assert_eq!(collection_name("Processes"), "Processes");
    }

    #[test]
    fn test_empty() {
        assert_eq!(collection_name(""), "");
    }
}
