//! Entity type discovery and validation

pub mod cache;
pub mod models;

pub use cache::{CacheSnapshot, EntityTypeCache, EntityTypeSource};
pub use models::{CacheState, TypeCheck, TypeSource, parse_entity_types};
