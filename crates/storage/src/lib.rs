//! Storage layer for docstore
//!
//! This crate implements the in-memory item store:
//! - PartitionRouter: partition key extraction and hash-range placement
//! - LogicalPartition: id-ordered documents behind a RwLock
//! - PartitionMap: DashMap from partition key to logical partition
//! - EtagSequence: catalog-wide AtomicU64 version source
//!
//! # Concurrency
//!
//! - Different logical partitions never contend
//! - Mutations within a partition serialize on its write lock
//! - Readers clone an `Arc` to the stored body, never a torn document

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod partition;
pub mod partition_map;
pub mod router;

pub use partition::{EtagSequence, LogicalPartition, ScanBatch, StoredDocument, UpsertOutcome};
pub use partition_map::PartitionMap;
pub use router::{PartitionRouter, Placement, THROUGHPUT_PER_PHYSICAL_PARTITION};
