//! Authentication modes for the Targetprocess API
//!
//! Basic tokens travel in the `Authorization` header. API keys are appended
//! as the trailing `access_token` query parameter. Neither is ever sent in a
//! request body.

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AuthConfig {
    /// Opaque token sent as `Authorization: Basic <token>`
    Basic { token: String },
    /// Token appended as `access_token=<token>`
    #[serde(rename = "apikey")]
    ApiKey { token: String },
}

impl AuthConfig {
    pub fn basic(token: impl Into<String>) -> Self {
        Self::Basic {
            token: token.into(),
        }
    }

    pub fn api_key(token: impl Into<String>) -> Self {
        Self::ApiKey {
            token: token.into(),
        }
    }

    /// Token to append to the query string, if this mode uses one
    pub fn query_token(&self) -> Option<&str> {
        match self {
            AuthConfig::ApiKey { token } => Some(token),
            AuthConfig::Basic { .. } => None,
        }
    }

    /// Value for the `Authorization` header, if this mode uses one
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthConfig::Basic { token } => Some(format!("Basic {}", token)),
            AuthConfig::ApiKey { .. } => None,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::ApiKey { .. } => "apikey",
        }
    }
}

// Tokens must not end up in logs
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthConfig::{}(***)", self.mode_name())
    }
}
