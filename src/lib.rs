//! docstore - partitioned document-store core
//!
//! docstore keeps JSON documents in containers partitioned by a key path,
//! versions every write with an ETag, answers filtered queries page by page,
//! and throttles each container to its provisioned request-unit rate.
//!
//! # Quick Start
//!
//! ```
//! use docstore::{ClientConfig, DocumentClient, PartitionKey, QueryOptions};
//! use serde_json::json;
//!
//! let client = DocumentClient::new(ClientConfig::new("https://localhost:8081", "key"))?;
//! let database = client.create_database_if_not_exists("FamilyDatabase")?;
//! let container = database.create_container_if_not_exists("FamilyContainer", "/LastName", 400)?;
//!
//! let family = json!({"id": "Andersen.1", "LastName": "Andersen"});
//! container.create_item(&family, &PartitionKey::from("Andersen"))?;
//!
//! let found = container
//!     .query_items("SELECT * FROM c WHERE c.LastName = 'Andersen'", QueryOptions::new())?
//!     .collect_items()?;
//! assert_eq!(found.len(), 1);
//! # Ok::<(), docstore::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `docstore-core`: errors, ETags, partition keys, field paths
//! - `docstore-storage`: partition routing and in-memory logical partitions
//! - `docstore-engine`: catalog, containers, queries and throughput control
//!
//! Only the engine API and the core value types are re-exported here.

pub use docstore_core::{
    EntityKind, ETag, Error, FieldPath, PartitionKey, PartitionKeyComponent,
    PartitionKeyDefinition, Result, Timestamp,
};
pub use docstore_engine::*;
