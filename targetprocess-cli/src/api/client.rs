//! Targetprocess API client
//!
//! Entry point for entity searches: validates the entity type against the
//! discovery cache, compiles the query options and sends the request through
//! the retrying transport.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::sync::Arc;

use super::auth::AuthConfig;
use super::constants::META_ENDPOINT;
use super::error::{ApiResult, TransportError, ValidationError};
use super::metadata::{EntityTypeCache, EntityTypeSource, TypeSource, parse_entity_types};
use super::pluralization::collection_name;
use super::query::{Query, QueryBuilder, QueryResponse};
use super::resilience::ResilienceConfig;
use super::transport::ApiTransport;

/// Semantic search options for one entity type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub entity_type: String,
    pub where_clause: Option<String>,
    pub include: Vec<String>,
    pub take: Option<u32>,
    pub order_by: Vec<String>,
}

impl SearchRequest {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            ..Self::default()
        }
    }

    pub fn to_builder(&self) -> QueryBuilder {
        let mut builder = QueryBuilder::new()
            .include(self.include.iter().cloned())
            .order_by(self.order_by.iter().cloned());
        if let Some(where_clause) = &self.where_clause {
            builder = builder.where_clause(where_clause.clone());
        }
        if let Some(take) = self.take {
            builder = builder.take(take);
        }
        builder
    }

    pub fn compile(&self) -> Result<Query, ValidationError> {
        self.to_builder().build()
    }
}

/// Lists entity types through the discovery endpoint
pub struct MetaEndpointSource {
    transport: ApiTransport,
}

impl MetaEndpointSource {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl EntityTypeSource for MetaEndpointSource {
    async fn fetch_entity_types(&self) -> Result<Vec<String>, TransportError> {
        let response = self
            .transport
            .get_json(META_ENDPOINT, &Query::default())
            .await?;
        Ok(parse_entity_types(&response))
    }
}

#[derive(Clone)]
pub struct TargetprocessClient {
    transport: ApiTransport,
    entity_types: Arc<EntityTypeCache>,
}

impl TargetprocessClient {
    pub fn new(base_url: &str, auth: AuthConfig, resilience: ResilienceConfig) -> Result<Self> {
        let transport = ApiTransport::new(base_url, auth, resilience)?;
        let source = Arc::new(MetaEndpointSource::new(transport.clone()));
        Ok(Self::with_entity_type_cache(
            transport,
            Arc::new(EntityTypeCache::new(source)),
        ))
    }

    pub fn with_entity_type_cache(transport: ApiTransport, entity_types: Arc<EntityTypeCache>) -> Self {
        Self {
            transport,
            entity_types,
        }
    }

    pub fn transport(&self) -> &ApiTransport {
        &self.transport
    }

    pub fn entity_type_cache(&self) -> &Arc<EntityTypeCache> {
        &self.entity_types
    }

    /// Legal entity type names and where they came from
    pub async fn entity_types(&self) -> (Vec<String>, TypeSource) {
        self.entity_types.entity_types().await
    }

    /// Validate the request and compile it, without sending anything
    pub async fn prepare(&self, request: &SearchRequest) -> ApiResult<Query> {
        let entity_type = request.entity_type.trim();
        if entity_type.is_empty() {
            return Err(ValidationError::new("entity type is required").into());
        }
        if !self.entity_types.is_valid(entity_type).await {
            return Err(ValidationError::new(format!("invalid entity type: '{}'", entity_type)).into());
        }
        Ok(request.compile()?)
    }

    /// Search entities of one type; returns the `Items` of the response
    pub async fn search_entities(&self, request: &SearchRequest) -> ApiResult<Vec<Value>> {
        let query = self.prepare(request).await?;
        let response = self
            .execute(request.entity_type.trim(), &query)
            .await?;

        if let Some(next) = &response.next {
            debug!(
                "{} search returned {} items, more available at {}",
                request.entity_type,
                response.items.len(),
                redact_token(next)
            );
        }
        Ok(response.items)
    }

    /// Send an already compiled query for an entity type
    pub async fn execute(&self, entity_type: &str, query: &Query) -> ApiResult<QueryResponse> {
        let collection = collection_name(entity_type);
        let value = self.transport.get_json(&collection, query).await?;
        Ok(QueryResponse::from_value(value))
    }
}

/// Strip an `access_token` value out of a URL before logging it
fn redact_token(url: &str) -> String {
    match url.find("access_token=") {
        Some(start) => {
            let value_start = start + "access_token=".len();
            let value_end = url[value_start..]
                .find('&')
                .map(|i| value_start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..value_start], &url[value_end..])
        }
        None => url.to_string(),
    }
}
