//! Fluent accumulator for query options
//!
//! Every setter consumes and returns the builder, so a partially configured
//! builder can be cloned and specialised without shared mutable state.
//! [`QueryBuilder::build`] validates everything at once and yields an
//! immutable [`Query`].

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::filters::{Filter, compile_where, format_field, join_filters};
use super::orderby::OrderBy;
use super::query::Query;
use crate::api::constants::FORMAT_JSON;
use crate::api::error::ValidationError;

static INCLUDE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z.]+$").expect("include regex is valid"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    where_clause: Option<String>,
    filters: Vec<Filter>,
    include: Vec<String>,
    take: Option<u32>,
    order_by: Vec<String>,
    format: Option<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw where clause in the service's query language
    pub fn where_clause(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    /// Typed condition, `and`-joined after any raw where clause
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn take(mut self, take: u32) -> Self {
        self.take = Some(take);
        self
    }

    pub fn order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Drop every accumulated option
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Validate and compile the accumulated options
    pub fn build(&self) -> Result<Query, ValidationError> {
        let where_clause = self.compile_where()?;
        let include = compile_include(&self.include)?;
        let order_by = OrderBy::compile(&self.order_by)?;

        let query = Query {
            format: self.format.clone().unwrap_or_else(|| FORMAT_JSON.to_string()),
            take: self.take,
            where_clause,
            include,
            order_by,
        };
        debug!("Compiled query: {:?}", query);
        Ok(query)
    }

    fn compile_where(&self) -> Result<Option<String>, ValidationError> {
        let mut parts = Vec::new();

        if let Some(raw) = &self.where_clause {
            parts.push(compile_where(raw)?);
        }
        if !self.filters.is_empty() {
            parts.push(join_filters(&self.filters));
        }

        Ok(if parts.is_empty() {
            None
        } else {
            Some(parts.join(" and "))
        })
    }
}

fn compile_include(fields: &[String]) -> Result<Option<Vec<String>>, ValidationError> {
    if fields.is_empty() {
        return Ok(None);
    }

    fields
        .iter()
        .map(|field| {
            let formatted = format_field(field.trim());
            if INCLUDE_FIELD.is_match(&formatted) {
                Ok(formatted)
            } else {
                Err(ValidationError::new(format!(
                    "invalid include field: '{}' (only letters and dots are allowed)",
                    field.trim()
                )))
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::OrderBy;

    #[test]
    fn test_build_all_options() {
        let query = QueryBuilder::new()
            .where_clause("EntityState.Name ne 'Done'")
            .include([" Project ", "Feature.Epic"])
            .take(50)
            .order_by(["CreateDate desc"])
            .build()
            .unwrap();

        assert_eq!(query.format, "json");
        assert_eq!(query.take, Some(50));
        assert_eq!(
            query.where_clause.as_deref(),
            Some("EntityState.Name ne 'Done'")
        );
        assert_eq!(query.include_value().as_deref(), Some("[Project,Feature.Epic]"));
        assert_eq!(query.order_by, OrderBy::Single("CreateDate".to_string()));
    }

    #[test]
    fn test_raw_where_and_typed_filters_are_joined() {
        let query = QueryBuilder::new()
            .where_clause("Name contains 'login'")
            .filter(Filter::eq("Project.Name", "Core"))
            .build()
            .unwrap();
        assert_eq!(
            query.where_clause.as_deref(),
            Some("Name contains 'login' and Project.Name eq 'Core'")
        );
    }

    #[test]
    fn test_invalid_include_rejected() {
        let err = QueryBuilder::new()
            .include(["Project", "Team[0]"])
            .build()
            .unwrap_err();
        assert!(err.reason.contains("Team[0]"));
    }

    #[test]
    fn test_empty_where_rejected() {
        assert_eq!(
            QueryBuilder::new().where_clause(" ").build().unwrap_err(),
            ValidationError::empty_where()
        );
    }

    #[test]
    fn test_clone_then_specialise() {
        let base = QueryBuilder::new().take(10).include(["Project"]);
        let bugs = base.clone().where_clause("Severity.Name eq 'Blocking'");

        assert!(base.build().unwrap().where_clause.is_none());
        assert!(bugs.build().unwrap().where_clause.is_some());
    }

    #[test]
    fn test_reset() {
        let mut builder = QueryBuilder::new().take(5).format("xml");
        builder.reset();
        assert_eq!(builder, QueryBuilder::new());
        assert_eq!(builder.build().unwrap().format, "json");
    }
}
