//! Targetprocess REST API Module
//!
//! Query compilation, entity type discovery and a retrying HTTP transport
//! for the Targetprocess REST API (v1).

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod pluralization;
pub mod query;
pub mod resilience;
pub mod transport;

pub use auth::AuthConfig;
pub use client::{MetaEndpointSource, SearchRequest, TargetprocessClient};
pub use error::{ApiError, ApiResult, NotFoundError, TransportError, ValidationError};
pub use metadata::{CacheState, EntityTypeCache, EntityTypeSource, TypeCheck, TypeSource};
pub use query::{Filter, FilterValue, Operator, OrderBy, Query, QueryBuilder, QueryResponse};
pub use resilience::{
    MonitoringConfig, RequestError, ResilienceConfig, RetryConfig, RetryPolicy, RetryableError,
};
pub use transport::ApiTransport;
