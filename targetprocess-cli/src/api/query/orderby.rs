//! Sort specification for Targetprocess queries
//!
//! The wire API only accepts bare field names. A single field goes out as
//! `orderBy=<field>`; several fields must use indexed names
//! (`orderBy[0]=A&orderBy[1]=B`), which generic form encoders mangle by
//! percent-encoding the brackets, so that case is serialised by hand.

use super::filters::format_field;
use crate::api::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    None,
    Single(String),
    Multi(Vec<String>),
}

impl OrderBy {
    /// Compile the caller's sort entries, dropping any `asc`/`desc` keyword
    pub fn compile<S: AsRef<str>>(entries: &[S]) -> Result<Self, ValidationError> {
        let mut fields = entries
            .iter()
            .map(|entry| strip_direction(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match fields.len() {
            0 => OrderBy::None,
            1 => OrderBy::Single(fields.remove(0)),
            _ => OrderBy::Multi(fields),
        })
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            OrderBy::None => Vec::new(),
            OrderBy::Single(field) => vec![field.as_str()],
            OrderBy::Multi(fields) => fields.iter().map(String::as_str).collect(),
        }
    }

    /// Parameter name/value pairs as the wire API expects them
    pub fn params(&self) -> Vec<(String, String)> {
        match self {
            OrderBy::None => Vec::new(),
            OrderBy::Single(field) => vec![("orderBy".to_string(), field.clone())],
            OrderBy::Multi(fields) => fields
                .iter()
                .enumerate()
                .map(|(i, field)| (format!("orderBy[{}]", i), field.clone()))
                .collect(),
        }
    }

    /// Query string fragment, brackets in parameter names left literal
    pub fn to_query_fragment(&self) -> Option<String> {
        match self {
            OrderBy::None => None,
            OrderBy::Single(field) => Some(format!("orderBy={}", urlencoding::encode(field))),
            OrderBy::Multi(fields) => Some(
                fields
                    .iter()
                    .enumerate()
                    .map(|(i, field)| format!("orderBy[{}]={}", i, urlencoding::encode(field)))
                    .collect::<Vec<_>>()
                    .join("&"),
            ),
        }
    }
}

/// `"CreateDate desc"` -> `"CreateDate"`
pub fn strip_direction(entry: &str) -> Result<String, ValidationError> {
    let mut tokens: Vec<&str> = entry.split_whitespace().collect();

    if let Some(last) = tokens.last() {
        if last.eq_ignore_ascii_case("asc") || last.eq_ignore_ascii_case("desc") {
            tokens.pop();
        }
    }

    let field = format_field(&tokens.join(" "));
    if field.is_empty() {
        return Err(ValidationError::new(format!(
            "invalid orderBy field: '{}'",
            entry.trim()
        )));
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_field_strips_direction() {
        let order = OrderBy::compile(&["CreateDate desc"]).unwrap();
        assert_eq!(order, OrderBy::Single("CreateDate".to_string()));
        assert_eq!(order.to_query_fragment().as_deref(), Some("orderBy=CreateDate"));
    }

    #[test]
    fn test_multi_field_uses_indexed_names() {
        let order = OrderBy::compile(&["Priority", "CreateDate desc"]).unwrap();
        assert_eq!(
            order.to_query_fragment().as_deref(),
            Some("orderBy[0]=Priority&orderBy[1]=CreateDate")
        );
        assert_eq!(
            order.params(),
            vec![
                ("orderBy[0]".to_string(), "Priority".to_string()),
                ("orderBy[1]".to_string(), "CreateDate".to_string()),
            ]
        );
    }

    #[test]
    fn test_direction_keyword_any_case() {
        assert_eq!(strip_direction("Name ASC").unwrap(), "Name");
        assert_eq!(strip_direction("  Name  ").unwrap(), "Name");
        assert_eq!(strip_direction("EntityState.Name Desc").unwrap(), "EntityState.Name");
    }

    #[test]
    fn test_bare_direction_is_invalid() {
        assert!(strip_direction("desc").is_err());
        assert!(OrderBy::compile(&["Name", ""]).is_err());
    }

    #[test]
    fn test_empty_list() {
        let order = OrderBy::compile::<&str>(&[]).unwrap();
        assert_eq!(order, OrderBy::None);
        assert!(order.to_query_fragment().is_none());
    }
}
