//! Targetprocess query client
//!
//! Compiles structured searches into Targetprocess REST v1 queries, validates
//! entity types against the service's discovery endpoint, retries transient
//! failures and pages large results for display.

pub mod api;
pub mod cli;
pub mod config;
pub mod services;
