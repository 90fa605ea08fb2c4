//! Core types for docstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Error: Error taxonomy shared by every layer
//! - ETag: Opaque, strictly increasing document version token
//! - Timestamp: Microsecond timestamps for stored versions
//! - FieldPath: Paths into JSON documents (dotted and slash forms)
//! - PartitionKey / PartitionKeyDefinition: Partition key values and paths
//! - document: Id and size validation for JSON documents
//! - limits: Size limits

#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod etag;
pub mod limits;
pub mod partition_key;
pub mod path;
pub mod timestamp;

pub use error::{EntityKind, Error, Result};
pub use etag::ETag;
pub use partition_key::{PartitionKey, PartitionKeyComponent, PartitionKeyDefinition};
pub use path::{FieldPath, PathSegment};
pub use timestamp::Timestamp;
