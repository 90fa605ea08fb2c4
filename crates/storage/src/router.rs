//! Partition routing
//!
//! The router turns documents into partition keys and partition keys into
//! placements. Both directions are pure functions of the container's
//! partition key definition and physical partition count, which are fixed
//! when the container is created. Repeated routing of the same key therefore
//! always lands on the same logical partition.
//!
//! # Placement
//!
//! The effective partition key is the xxh3 hash of the key's canonical
//! encoding. The 64-bit hash space is split into `physical_partitions`
//! equal ranges; a key is placed in the range its hash falls into.

use docstore_core::{Error, PartitionKey, PartitionKeyComponent, PartitionKeyDefinition, Result};
use serde_json::Value;

/// Request units served by one physical partition
pub const THROUGHPUT_PER_PHYSICAL_PARTITION: u32 = 10_000;

/// Where a logical partition lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    /// 64-bit hash of the partition key
    pub effective_key: u64,
    /// Index of the physical partition owning the hash range
    pub physical_partition: u32,
}

/// Maps documents to partition keys and keys to placements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRouter {
    definition: PartitionKeyDefinition,
    physical_partitions: u32,
}

impl PartitionRouter {
    /// Create a router with an explicit physical partition count
    ///
    /// A count of zero is treated as one.
    pub fn new(definition: PartitionKeyDefinition, physical_partitions: u32) -> Self {
        Self {
            definition,
            physical_partitions: physical_partitions.max(1),
        }
    }

    /// Create a router sized for the container's initial throughput
    pub fn for_throughput(definition: PartitionKeyDefinition, throughput: u32) -> Self {
        let count = throughput / THROUGHPUT_PER_PHYSICAL_PARTITION
            + u32::from(throughput % THROUGHPUT_PER_PHYSICAL_PARTITION != 0);
        Self::new(definition, count)
    }

    /// The partition key definition this router extracts
    pub fn definition(&self) -> &PartitionKeyDefinition {
        &self.definition
    }

    /// Number of physical partitions
    pub fn physical_partitions(&self) -> u32 {
        self.physical_partitions
    }

    /// Extract the partition key from a document
    ///
    /// Fails with `MissingPartitionKey` if a configured path is absent or
    /// holds an object or array.
    pub fn resolve(&self, doc: &Value) -> Result<PartitionKey> {
        let mut components = Vec::with_capacity(self.definition.paths().len());
        for path in self.definition.paths() {
            let component = path
                .resolve(doc)
                .and_then(PartitionKeyComponent::from_json)
                .ok_or_else(|| Error::MissingPartitionKey {
                    path: path.to_slash_string(),
                })?;
            components.push(component);
        }
        Ok(PartitionKey::composite(components))
    }

    /// Extract the partition key, mapping absent paths to `Undefined`
    ///
    /// Used when the caller explicitly addresses the "none" partition.
    /// Non-scalar values are still rejected.
    pub fn resolve_lenient(&self, doc: &Value) -> Result<PartitionKey> {
        let mut components = Vec::with_capacity(self.definition.paths().len());
        for path in self.definition.paths() {
            let component = match path.resolve(doc) {
                None => PartitionKeyComponent::Undefined,
                Some(value) => PartitionKeyComponent::from_json(value).ok_or_else(|| {
                    Error::MissingPartitionKey {
                        path: path.to_slash_string(),
                    }
                })?,
            };
            components.push(component);
        }
        Ok(PartitionKey::composite(components))
    }

    /// Check that a caller-supplied key has one component per configured path
    pub fn check_shape(&self, key: &PartitionKey) -> Result<()> {
        let expected = self.definition.paths().len();
        if key.len() != expected {
            return Err(Error::invalid_input(format!(
                "partition key {} has {} components, container {} expects {}",
                key,
                key.len(),
                self.definition,
                expected
            )));
        }
        key.validate()
    }

    /// Placement of a partition key; a pure function of (router, key)
    pub fn placement(&self, key: &PartitionKey) -> Placement {
        let effective_key = key.effective_hash();
        let physical_partition =
            ((effective_key as u128 * self.physical_partitions as u128) >> 64) as u32;
        Placement {
            effective_key,
            physical_partition,
        }
    }
}
