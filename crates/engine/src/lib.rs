//! Document store engine
//!
//! This crate orchestrates the storage layer into a client-facing API:
//! - DocumentClient: entry point built from a ClientConfig
//! - Catalog / Database / Container: idempotent lifecycle and item API
//! - Governor: per-container request-unit admission control
//! - query: text and builder predicates, paged QueryIterator
//!
//! The engine is the only component that knows about:
//! - Container lifecycle states
//! - Request charges and throttling
//! - Partition pruning for queries

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod client;
pub mod config;
pub mod container;
pub mod cost;
pub mod database;
pub mod query;
pub mod response;
pub mod throughput;

pub use catalog::Catalog;
pub use client::DocumentClient;
pub use config::ClientConfig;
pub use container::{Container, ContainerProperties, ContainerState};
pub use cost::{CostModel, RequestCharge};
pub use database::{Database, DatabaseProperties};
pub use docstore_storage::UpsertOutcome;
pub use query::{
    CompareOp, Comparison, Predicate, QueryDefinition, QueryIterator, QueryMetrics, QueryOptions,
    QuerySpec,
};
pub use response::{CreateResponse, CreateStatus, FeedPage, ItemResponse};
pub use throughput::{Admission, Clock, Governor, GovernorStats, ManualClock, SystemClock};
