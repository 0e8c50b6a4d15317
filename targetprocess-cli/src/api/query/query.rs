//! Compiled, wire-ready query

use super::orderby::OrderBy;
use crate::api::auth::AuthConfig;
use crate::api::constants::{ACCESS_TOKEN_PARAM, FORMAT_JSON};

/// A validated query. Produced by [`QueryBuilder::build`](super::QueryBuilder::build),
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub format: String,
    pub take: Option<u32>,
    pub where_clause: Option<String>,
    pub include: Option<Vec<String>>,
    pub order_by: OrderBy,
}

impl Default for Query {
    /// Bare `format=json` query
    fn default() -> Self {
        Self {
            format: FORMAT_JSON.to_string(),
            take: None,
            where_clause: None,
            include: None,
            order_by: OrderBy::None,
        }
    }
}

impl Query {
    /// `[Project,Team]`
    pub fn include_value(&self) -> Option<String> {
        self.include
            .as_ref()
            .map(|fields| format!("[{}]", fields.join(",")))
    }

    /// Ordered parameter list, auth token last when the mode carries one.
    ///
    /// Names are raw (`orderBy[0]`). Feed this to logging or display, not to
    /// a form encoder; use [`Query::to_query_string`] for the request itself.
    pub fn params(&self, auth: Option<&AuthConfig>) -> Vec<(String, String)> {
        let mut params = vec![("format".to_string(), self.format.clone())];

        if let Some(take) = self.take {
            params.push(("take".to_string(), take.to_string()));
        }
        if let Some(where_clause) = &self.where_clause {
            params.push(("where".to_string(), where_clause.clone()));
        }
        if let Some(include) = self.include_value() {
            params.push(("include".to_string(), include));
        }
        params.extend(self.order_by.params());

        if let Some(token) = auth.and_then(AuthConfig::query_token) {
            params.push((ACCESS_TOKEN_PARAM.to_string(), token.to_string()));
        }
        params
    }

    /// Wire query string without the leading `?`
    pub fn to_query_string(&self, auth: &AuthConfig) -> String {
        let mut parts = vec![format!("format={}", urlencoding::encode(&self.format))];

        if let Some(take) = self.take {
            parts.push(format!("take={}", take));
        }
        if let Some(where_clause) = &self.where_clause {
            parts.push(format!("where={}", urlencoding::encode(where_clause)));
        }
        if let Some(include) = self.include_value() {
            parts.push(format!("include={}", urlencoding::encode(&include)));
        }
        if let Some(fragment) = self.order_by.to_query_fragment() {
            parts.push(fragment);
        }
        if let Some(token) = auth.query_token() {
            parts.push(format!(
                "{}={}",
                ACCESS_TOKEN_PARAM,
                urlencoding::encode(token)
            ));
        }

        parts.join("&")
    }
}
