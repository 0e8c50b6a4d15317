//! HTTP transport for the Targetprocess REST API
//!
//! Builds request URLs from compiled queries, applies authentication and
//! correlation headers, and runs every request under the retry policy.

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

use super::auth::AuthConfig;
use super::constants::{API_V1_PATH, CORRELATION_ID_HEADER};
use super::error::TransportError;
use super::query::Query;
use super::resilience::{MonitoringConfig, RequestError, ResilienceConfig, RetryPolicy};

const USER_AGENT: &str = concat!("targetprocess-cli/", env!("CARGO_PKG_VERSION"));

/// Longest error body excerpt carried into an error message
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Clone)]
pub struct ApiTransport {
    http: reqwest::Client,
    base_url: String,
    auth: AuthConfig,
    retry: RetryPolicy,
    monitoring: MonitoringConfig,
}

impl ApiTransport {
    pub fn new(base_url: &str, auth: AuthConfig, resilience: ResilienceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            retry: RetryPolicy::new(resilience.retry),
            monitoring: resilience.monitoring,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthConfig {
        &self.auth
    }

    /// Full request URL for `path` under `/api/v1`
    pub fn url_for(&self, path: &str, query: &Query) -> String {
        format!(
            "{}{}/{}?{}",
            self.base_url,
            API_V1_PATH,
            path.trim_start_matches('/'),
            query.to_query_string(&self.auth)
        )
    }

    /// GET `path` with `query` and parse the JSON body, retrying transient
    /// failures
    pub async fn get_json(&self, path: &str, query: &Query) -> Result<Value, TransportError> {
        // The query string is passed through as-is: indexed `orderBy[n]`
        // names must reach the server with literal brackets.
        let url = self.url_for(path, query);
        let label = format!("GET {}/{}", API_V1_PATH, path.trim_start_matches('/'));

        self.retry
            .execute(&label, || self.send_get(&url, &label))
            .await
    }

    async fn send_get(&self, url: &str, label: &str) -> Result<Value, RequestError> {
        let mut request = self.http.get(url).header(ACCEPT, "application/json");

        if let Some(value) = self.auth.header_value() {
            request = request.header(AUTHORIZATION, value);
        }

        let correlation_id = self.monitoring.correlation_ids.then(|| Uuid::new_v4().to_string());
        if let Some(id) = &correlation_id {
            request = request.header(CORRELATION_ID_HEADER, id.as_str());
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();

        if self.monitoring.request_logging {
            debug!(
                "{} -> {} in {:?}{}",
                label,
                status,
                started.elapsed(),
                correlation_id
                    .as_deref()
                    .map(|id| format!(" [{}]", id))
                    .unwrap_or_default()
            );
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("request failed");
            return Err(RequestError::status(
                status.as_u16(),
                error_message(&body, reason),
            ));
        }

        // A body cut off mid-read is a network failure and carries no status
        let body = response.bytes().await?;
        serde_json::from_slice::<Value>(&body).map_err(|e| {
            RequestError::status(status.as_u16(), format!("invalid JSON response: {}", e))
        })
    }
}

/// Prefer the service's `Message` field, then a trimmed body excerpt
fn error_message(body: &str, reason: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("Message").and_then(Value::as_str) {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        return reason.to_string();
    }
    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    if excerpt.len() < body.len() {
        format!("{}: {}...", reason, excerpt)
    } else {
        format!("{}: {}", reason, excerpt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::query::QueryBuilder;
    use crate::api::resilience::RetryConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_url_for_api_key() {
        let transport = ApiTransport::new(
            "https://acme.tpondemand.com/",
            AuthConfig::api_key("tok"),
            ResilienceConfig::disabled(),
        )
        .unwrap();
        let query = QueryBuilder::new()
            .order_by(["Priority", "Name"])
            .build()
            .unwrap();

        assert_eq!(
            transport.url_for("UserStories", &query),
            "https://acme.tpondemand.com/api/v1/UserStories?format=json&orderBy[0]=Priority&orderBy[1]=Name&access_token=tok"
        );
    }

    /// Serves each connection a 200 declaring `declared` body bytes
    /// but only `body` actually written, then hangs up
    async fn truncating_server(declared: usize, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    declared, body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (base_url, hits)
    }

    fn quick_retries(max_retries: u32) -> ResilienceConfig {
        ResilienceConfig::builder()
            .retry_config(RetryConfig {
                max_retries,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                attempt_timeout: Some(Duration::from_secs(5)),
                ..RetryConfig::default()
            })
            .build()
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried() {
        let (base_url, hits) = truncating_server(100, r#"{"It"#).await;
        let transport =
            ApiTransport::new(&base_url, AuthConfig::api_key("tok"), quick_retries(2)).unwrap();

        let err = transport
            .get_json("Bugs", &Query::default())
            .await
            .unwrap_err();

        assert!(!err.is_terminal(), "unexpected terminal error: {err:?}");
        assert_eq!(err.status(), None);
        assert_eq!(err.attempts(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_complete_but_invalid_json_is_terminal() {
        let (base_url, hits) = truncating_server(9, "not json!").await;
        let transport =
            ApiTransport::new(&base_url, AuthConfig::api_key("tok"), quick_retries(2)).unwrap();

        let err = transport
            .get_json("Bugs", &Query::default())
            .await
            .unwrap_err();

        assert!(err.is_terminal());
        assert_eq!(err.status(), Some(200));
        assert!(err.message().contains("invalid JSON response"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_message_prefers_service_message() {
        let body = r#"{"Status":"BadRequest","Message":"Unknown field 'Foo'"}"#;
        assert_eq!(error_message(body, "Bad Request"), "Unknown field 'Foo'");
        assert_eq!(error_message("", "Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("oops", "Bad Gateway"), "Bad Gateway: oops");
    }
}
