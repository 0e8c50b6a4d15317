//! Where-clause compilation for the Targetprocess query language
//!
//! A where clause is a list of conditions joined by `and`. Each condition is
//! either a null test (`Field is null`, `Field is not null`) or a comparison
//! (`Field <op> <value>`). Compilation normalises field names, formats values
//! the way the wire API expects and re-joins the conditions.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::constants::{CUSTOM_FIELD_MARKER, CUSTOM_FIELD_WIRE_PREFIX};
use crate::api::error::ValidationError;

static NULL_TEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(is\s+(?:not\s+)?null)$").expect("null test regex is valid")
});

/// Words that cannot appear inside a field name
const RESERVED_WORDS: [&str; 12] = [
    "and", "contains", "eq", "gt", "gte", "in", "is", "lt", "lte", "ne", "not", "null",
];

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(not\s+contains|contains|gte|gt|lte|lt|eq|ne|in)\s+(.+)$")
        .expect("comparison regex is valid")
});

/// Comparison operators understood by the wire API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    NotContains,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::Contains,
        Operator::NotContains,
    ];

    /// Parse an operator keyword, ignoring case and inner whitespace runs
    pub fn parse(keyword: &str) -> Option<Self> {
        let normalized = keyword
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "eq" => Some(Operator::Eq),
            "ne" => Some(Operator::Ne),
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            "contains" => Some(Operator::Contains),
            "not contains" => Some(Operator::NotContains),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition value, typed by what its raw text looks like
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Date(NaiveDate),
    List(Vec<FilterValue>),
    String(String),
}

impl FilterValue {
    /// Infer a value from the raw right-hand side of a condition
    pub fn parse_raw(raw: &str) -> Self {
        let raw = raw.trim();

        if raw.eq_ignore_ascii_case("null") {
            return FilterValue::Null;
        }
        if raw.eq_ignore_ascii_case("true") {
            return FilterValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return FilterValue::Bool(false);
        }

        let bracketed = (raw.starts_with('[') && raw.ends_with(']'))
            || (raw.starts_with('(') && raw.ends_with(')'));
        if bracketed && raw.len() >= 2 {
            let inner = &raw[1..raw.len() - 1];
            if inner.trim().is_empty() {
                return FilterValue::List(Vec::new());
            }
            return FilterValue::List(
                split_outside_quotes(inner, ',')
                    .iter()
                    .map(|item| FilterValue::parse_raw(item))
                    .collect(),
            );
        }

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return FilterValue::Date(date);
        }
        if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
            return FilterValue::Date(datetime.date_naive());
        }

        FilterValue::String(unquote(raw))
    }

    /// Wire representation. Strings are always single-quoted with embedded
    /// single quotes doubled.
    pub fn to_wire(&self) -> String {
        match self {
            FilterValue::Null => "null".to_string(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            FilterValue::List(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(FilterValue::to_wire)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            FilterValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(values: Vec<T>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// One compiled condition of a where clause
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `Field is null` / `Field is not null`, test text kept as written
    NullTest {
        field: String,
        negated: bool,
        test: String,
    },
    Compare {
        field: String,
        op: Operator,
        value: FilterValue,
    },
}

impl Filter {
    pub fn new(field: &str, op: Operator, value: impl Into<FilterValue>) -> Self {
        Filter::Compare {
            field: format_field(field),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn ne(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    pub fn gt(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn gte(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Gte, value)
    }

    pub fn lt(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Lt, value)
    }

    pub fn lte(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Lte, value)
    }

    pub fn contains(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::Contains, value)
    }

    pub fn not_contains(field: &str, value: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::NotContains, value)
    }

    pub fn is_in(field: &str, values: impl Into<FilterValue>) -> Self {
        Self::new(field, Operator::In, values)
    }

    pub fn is_null(field: &str) -> Self {
        Filter::NullTest {
            field: format_field(field),
            negated: false,
            test: "is null".to_string(),
        }
    }

    pub fn is_not_null(field: &str) -> Self {
        Filter::NullTest {
            field: format_field(field),
            negated: true,
            test: "is not null".to_string(),
        }
    }

    /// Parse a single condition (no `and`)
    pub fn parse(condition: &str) -> Result<Self, ValidationError> {
        let condition = condition.trim();

        if let Some(caps) = NULL_TEST.captures(condition) {
            if !is_plain_field(&caps[1]) {
                return Err(ValidationError::invalid_condition(condition));
            }
            let test = caps[2].to_string();
            let negated = test.to_lowercase().contains("not");
            return Ok(Filter::NullTest {
                field: format_field(&caps[1]),
                negated,
                test,
            });
        }

        let caps = COMPARISON
            .captures(condition)
            .ok_or_else(|| ValidationError::invalid_condition(condition))?;
        let op = Operator::parse(&caps[2]).ok_or_else(|| {
            ValidationError::new(format!(
                "invalid condition: {} (unsupported operator '{}')",
                condition, &caps[2]
            ))
        })?;
        let field = format_field(&caps[1]);
        if field.is_empty() || !is_plain_field(&caps[1]) || !is_complete_value(&caps[3]) {
            return Err(ValidationError::invalid_condition(condition));
        }

        Ok(Filter::Compare {
            field,
            op,
            value: FilterValue::parse_raw(&caps[3]),
        })
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::NullTest { field, .. } | Filter::Compare { field, .. } => field,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::NullTest { field, test, .. } => write!(f, "{} {}", field, test),
            Filter::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op, value.to_wire())
            }
        }
    }
}

/// Normalise a field name for the wire: drop whitespace and map the
/// `CustomField.` namespace onto the `cf_` prefix
pub fn format_field(field: &str) -> String {
    let compact: String = field.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.strip_prefix(CUSTOM_FIELD_MARKER) {
        Some(name) => format!("{}{}", CUSTOM_FIELD_WIRE_PREFIX, name),
        None => compact,
    }
}

/// Split a where clause on ` and ` (any case), never inside a quoted literal
pub fn split_conditions(input: &str) -> Vec<String> {
    const SEPARATOR: &str = " and ";

    let lower = input.to_ascii_lowercase();
    let mut conditions = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut chars = input.char_indices();

    while let Some((pos, ch)) = chars.next() {
        match quote {
            Some(open) => {
                if ch == open && !escaped {
                    quote = None;
                }
            }
            None => {
                if (ch == '\'' || ch == '"') && !escaped {
                    quote = Some(ch);
                } else if lower[pos..].starts_with(SEPARATOR) {
                    conditions.push(input[start..pos].trim().to_string());
                    start = pos + SEPARATOR.len();
                    // separator is ASCII, one char per byte
                    for _ in 1..SEPARATOR.len() {
                        chars.next();
                    }
                    escaped = false;
                    continue;
                }
            }
        }
        escaped = ch == '\\' && !escaped;
    }

    conditions.push(input[start..].trim().to_string());
    conditions
}

/// Parse a full where clause into its conditions
pub fn parse_where(input: &str) -> Result<Vec<Filter>, ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::empty_where());
    }

    split_conditions(input.trim())
        .iter()
        .map(|condition| {
            if condition.is_empty() {
                return Err(ValidationError::new(format!(
                    "invalid condition: empty condition in '{}'",
                    input.trim()
                )));
            }
            Filter::parse(condition)
        })
        .collect()
}

/// Compile a where clause into its wire form
pub fn compile_where(input: &str) -> Result<String, ValidationError> {
    Ok(join_filters(&parse_where(input)?))
}

pub fn join_filters(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" and ")
}

/// A field is one or more bare words, none of them an operator keyword
fn is_plain_field(raw: &str) -> bool {
    !raw.contains(['\'', '"'])
        && raw
            .split_whitespace()
            .all(|word| !RESERVED_WORDS.iter().any(|r| word.eq_ignore_ascii_case(r)))
}

/// A quoted value must be exactly one literal; an unquoted one must not end
/// in a dangling `and`
fn is_complete_value(raw: &str) -> bool {
    let raw = raw.trim();
    match raw.chars().next() {
        Some(open @ ('\'' | '"')) => is_single_literal(raw, open),
        Some('[') | Some('(') => true,
        _ => !raw
            .split_whitespace()
            .any(|word| word.eq_ignore_ascii_case("and")),
    }
}

/// Whether the literal opened by `raw`'s first char closes on its last char.
/// Inside single quotes `''` is an escaped quote; `\` escapes the next char.
fn is_single_literal(raw: &str, open: char) -> bool {
    let rest: Vec<char> = raw.chars().skip(1).collect();
    let mut i = 0;
    while i < rest.len() {
        let ch = rest[i];
        if ch == '\\' {
            i += 2;
            continue;
        }
        if ch == open {
            if open == '\'' && rest.get(i + 1) == Some(&'\'') {
                i += 2;
                continue;
            }
            return i == rest.len() - 1;
        }
        i += 1;
    }
    false
}

/// Strip wrapping quotes and undo the escaping that belongs to them
fn unquote(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].replace("''", "'").replace("\\'", "'");
    }
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return raw[1..raw.len() - 1].replace("\\\"", "\"");
    }
    raw.to_string()
}

fn split_outside_quotes(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in input.chars() {
        match quote {
            Some(open) if ch == open && !escaped => quote = None,
            Some(_) => {}
            None if (ch == '\'' || ch == '"') && !escaped => quote = Some(ch),
            None if ch == separator => {
                parts.push(std::mem::take(&mut current).trim().to_string());
                escaped = false;
                continue;
            }
            None => {}
        }
        escaped = ch == '\\' && !escaped;
        current.push(ch);
    }
    parts.push(current.trim().to_string());
    parts
}
