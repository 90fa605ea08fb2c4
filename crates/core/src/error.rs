//! Error types for docstore
//!
//! Every fallible operation in the workspace returns [`Result<T>`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | Status |
//! |----------|----------|--------|
//! | Not Found | `NotFound` | 404 |
//! | Concurrency | `Conflict`, `PreconditionFailed` | 409, 412 |
//! | Validation | `MissingPartitionKey`, `PartitionKeyMismatch`, `InvalidInput`, `InvalidQuery` | 400 |
//! | Capacity | `Throttled`, `RequestTooLarge` | 429, 413 |
//! | State | `InvalidContainerState` | 409 |
//! | System | `Config`, `Serialization` | 500 |
//!
//! Only `Throttled` is retryable. All other errors are terminal for the
//! operation that produced them.

use std::fmt;
use std::time::Duration;

use crate::etag::ETag;

/// Result type alias for docstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A database in the catalog
    Database,
    /// A container inside a database
    Container,
    /// A document inside a container
    Document,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Database => write!(f, "database"),
            EntityKind::Container => write!(f, "container"),
            EntityKind::Document => write!(f, "document"),
        }
    }
}

/// Error types for docstore
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    // ==================== Not Found ====================
    /// Entity or document absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    // ==================== Concurrency ====================
    /// Duplicate id on create
    #[error("{entity} already exists: {id}")]
    Conflict { entity: EntityKind, id: String },

    /// ETag mismatch on a conditional write
    #[error("precondition failed for {id}: expected etag {expected}, current etag {actual}")]
    PreconditionFailed {
        id: String,
        expected: ETag,
        actual: ETag,
    },

    // ==================== Validation ====================
    /// Document lacks the configured partition key field
    #[error("document is missing partition key path {path}")]
    MissingPartitionKey { path: String },

    /// Partition key supplied with the request differs from the document's
    #[error("partition key mismatch: request has {supplied}, document has {actual}")]
    PartitionKeyMismatch { supplied: String, actual: String },

    /// Invalid input
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Query text or predicate could not be parsed
    #[error("invalid query at offset {offset}: {reason}")]
    InvalidQuery { offset: usize, reason: String },

    // ==================== Capacity ====================
    /// Provisioned throughput exhausted for the current window
    #[error("request rate too large, retry after {}ms", .retry_after.as_millis())]
    Throttled { retry_after: Duration },

    /// Document exceeds the maximum serialized size
    #[error("request too large: {size} bytes exceeds maximum of {max} bytes")]
    RequestTooLarge { size: usize, max: usize },

    // ==================== State ====================
    /// Operation not permitted in the container's current lifecycle state
    #[error("container {container} is {state}")]
    InvalidContainerState { container: String, state: String },

    // ==================== System ====================
    /// Configuration could not be read or failed validation
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Serialization error
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl Error {
    /// Not found error for an entity
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Conflict error for an entity
    pub fn conflict(entity: EntityKind, id: impl Into<String>) -> Self {
        Error::Conflict {
            entity,
            id: id.into(),
        }
    }

    /// Invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Invalid query error at a character offset
    pub fn invalid_query(offset: usize, reason: impl Into<String>) -> Self {
        Error::InvalidQuery {
            offset,
            reason: reason.into(),
        }
    }

    /// Configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// HTTP-style status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Conflict { .. } | Error::InvalidContainerState { .. } => 409,
            Error::PreconditionFailed { .. } => 412,
            Error::MissingPartitionKey { .. }
            | Error::PartitionKeyMismatch { .. }
            | Error::InvalidInput { .. }
            | Error::InvalidQuery { .. } => 400,
            Error::RequestTooLarge { .. } => 413,
            Error::Throttled { .. } => 429,
            Error::Config { .. } | Error::Serialization { .. } => 500,
        }
    }

    /// Whether the caller may retry the same operation after backing off
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Throttled { .. })
    }

    /// Retry hint carried by a throttling error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Throttled { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization {
            reason: e.to_string(),
        }
    }
}
