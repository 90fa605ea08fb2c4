//! Per-container partition map
//!
//! Maps partition key values to their [`LogicalPartition`], sharded by
//! `DashMap` so operations on different partitions never contend.
//!
//! - `route()`: lookup only, never creates a partition
//! - `route_or_create()`: creates the partition lazily on first insert
//! - `partitions_ordered()`: snapshot of partition handles in
//!   effective-partition-key order, used by cross-partition scans
//!
//! Empty logical partitions are kept after their last document is deleted.

use dashmap::DashMap;
use docstore_core::{PartitionKey, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::partition::{EtagSequence, LogicalPartition};
use crate::router::PartitionRouter;

/// Logical partitions of one container
#[derive(Debug)]
pub struct PartitionMap {
    router: PartitionRouter,
    etags: Arc<EtagSequence>,
    partitions: DashMap<PartitionKey, Arc<LogicalPartition>>,
}

impl PartitionMap {
    /// Create an empty map routed by `router`, drawing ETags from `etags`
    ///
    /// The sequence may be shared with other maps; ETags stay unique across
    /// every map drawing from it.
    pub fn new(router: PartitionRouter, etags: Arc<EtagSequence>) -> Self {
        Self {
            router,
            etags,
            partitions: DashMap::new(),
        }
    }

    /// The router used to place keys
    pub fn router(&self) -> &PartitionRouter {
        &self.router
    }

    /// ETag sequence this map draws from
    pub fn etags(&self) -> &EtagSequence {
        &self.etags
    }

    /// Extract the partition key of a document
    pub fn resolve(&self, doc: &Value) -> Result<PartitionKey> {
        self.router.resolve(doc)
    }

    /// Find the partition for `key`, if it has been created
    pub fn route(&self, key: &PartitionKey) -> Option<Arc<LogicalPartition>> {
        self.partitions.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Find or lazily create the partition for `key`
    ///
    /// Concurrent callers racing on a new key all receive the same `Arc`.
    pub fn route_or_create(&self, key: &PartitionKey) -> Arc<LogicalPartition> {
        if let Some(existing) = self.route(key) {
            return existing;
        }
        let entry = self.partitions.entry(key.clone()).or_insert_with(|| {
            let placement = self.router.placement(key);
            debug!(
                target: "docstore::storage",
                partition_key = %key,
                physical_partition = placement.physical_partition,
                "Logical partition created"
            );
            Arc::new(LogicalPartition::new(
                key.clone(),
                placement,
                Arc::clone(&self.etags),
            ))
        });
        Arc::clone(entry.value())
    }

    /// Snapshot of every partition, ordered by effective partition key
    ///
    /// Hash ties are broken by the canonical key encoding so the order is
    /// total and stable across calls.
    pub fn partitions_ordered(&self) -> Vec<Arc<LogicalPartition>> {
        let mut partitions: Vec<_> = self
            .partitions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        partitions.sort_by_cached_key(|p| (p.placement().effective_key, p.key().encode()));
        partitions
    }

    /// Number of logical partitions
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Total number of documents across all partitions
    pub fn document_count(&self) -> usize {
        self.partitions.iter().map(|entry| entry.value().len()).sum()
    }

    /// Drop every partition and document, returning the number of documents
    ///
    /// Handles still held by in-flight readers keep working but are no
    /// longer reachable from this map.
    pub fn clear(&self) -> usize {
        let partitions: Vec<_> = self
            .partitions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.partitions.clear();
        let removed = partitions.iter().map(|p| p.clear()).sum();
        debug!(
            target: "docstore::storage",
            partitions = partitions.len(),
            documents = removed,
            "Partition map cleared"
        );
        removed
    }
}
