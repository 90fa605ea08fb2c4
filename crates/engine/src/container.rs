//! Containers
//!
//! A [`Container`] binds a partition key definition, a partition map and a
//! throughput governor, and exposes the item and query API.
//!
//! # Lifecycle
//!
//! ```text
//! Provisioning -> Active <-> ThroughputScaling
//!                   |               |
//!                   +--> Deleting <-+
//!                           |
//!                        Deleted
//! ```
//!
//! Item and query operations are accepted in `Active` and
//! `ThroughputScaling`. A container being deleted reports `NotFound`.
//!
//! # Request flow
//!
//! Every item operation checks the lifecycle, validates its input, then
//! charges the governor before touching the partition. Validation failures
//! are free; a mutation that is admitted and then fails (for example on an
//! ETag mismatch) keeps its charge. Reads and query pages are charged after
//! the result is known, and a throttled result is discarded.
//!
//! Mutations hold the lifecycle read lock until they are applied, so a
//! deletion never leaves documents behind in a `Deleted` container.

use docstore_core::document::{document_id, validate_id, validate_size};
use docstore_core::{
    ETag, EntityKind, Error, PartitionKey, PartitionKeyComponent, PartitionKeyDefinition, Result,
    Timestamp,
};
use docstore_storage::{
    EtagSequence, LogicalPartition, PartitionMap, PartitionRouter, UpsertOutcome,
};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::cost::{CostModel, RequestCharge};
use crate::query::{QueryIterator, QueryOptions, QuerySpec};
use crate::response::ItemResponse;
use crate::throughput::Governor;

// ============================================================================
// Lifecycle
// ============================================================================

/// Container lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Being set up; not yet accepting requests
    Provisioning,
    /// Serving requests
    Active,
    /// Serving requests while throughput changes
    ThroughputScaling,
    /// Being torn down
    Deleting,
    /// Gone
    Deleted,
}

impl ContainerState {
    /// Whether item and query operations are accepted
    pub fn accepts_requests(self) -> bool {
        matches!(self, ContainerState::Active | ContainerState::ThroughputScaling)
    }

    fn can_transition_to(self, next: ContainerState) -> bool {
        use ContainerState::*;
        matches!(
            (self, next),
            (Provisioning, Active)
                | (Active, ThroughputScaling)
                | (ThroughputScaling, Active)
                | (Provisioning, Deleting)
                | (Active, Deleting)
                | (ThroughputScaling, Deleting)
                | (Deleting, Deleted)
        )
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerState::Provisioning => "provisioning",
            ContainerState::Active => "active",
            ContainerState::ThroughputScaling => "scaling throughput",
            ContainerState::Deleting => "deleting",
            ContainerState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Shared lifecycle cell, also held by open query iterators
#[derive(Debug)]
pub(crate) struct Lifecycle {
    container: String,
    state: RwLock<ContainerState>,
}

impl Lifecycle {
    pub(crate) fn new(container: &str) -> Self {
        Self {
            container: container.to_string(),
            state: RwLock::new(ContainerState::Provisioning),
        }
    }

    pub(crate) fn state(&self) -> ContainerState {
        *self.state.read()
    }

    /// Fail unless requests are accepted in the current state
    pub(crate) fn check_accepting(&self) -> Result<()> {
        self.enter().map(drop)
    }

    /// Read-lock the state for the duration of a mutation
    ///
    /// Fails like [`check_accepting`](Self::check_accepting). While the guard
    /// is held no transition can happen, so a deletion waits for in-flight
    /// writes and no write lands after the partitions are cleared.
    pub(crate) fn enter(&self) -> Result<RwLockReadGuard<'_, ContainerState>> {
        let state = self.state.read();
        match *state {
            ContainerState::Active | ContainerState::ThroughputScaling => Ok(state),
            ContainerState::Deleting | ContainerState::Deleted => {
                Err(Error::not_found(EntityKind::Container, &self.container))
            }
            ContainerState::Provisioning => Err(self.invalid_state(*state)),
        }
    }

    /// Move to `next`, failing on an illegal transition
    pub(crate) fn transition(&self, next: ContainerState) -> Result<ContainerState> {
        let mut state = self.state.write();
        let current = *state;
        if !current.can_transition_to(next) {
            return Err(match current {
                ContainerState::Deleting | ContainerState::Deleted => {
                    Error::not_found(EntityKind::Container, &self.container)
                }
                _ => self.invalid_state(current),
            });
        }
        *state = next;
        Ok(current)
    }

    fn invalid_state(&self, state: ContainerState) -> Error {
        Error::InvalidContainerState {
            container: self.container.clone(),
            state: state.to_string(),
        }
    }
}

// ============================================================================
// Container
// ============================================================================

/// Immutable description of a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerProperties {
    /// Container name
    pub id: String,
    /// Owning database name
    pub database: String,
    /// Unique id of this container instance
    pub resource_id: Uuid,
    /// Partition key path(s)
    pub partition_key: PartitionKeyDefinition,
    /// Physical partitions fixed at creation
    pub physical_partitions: u32,
    /// Creation time
    pub created: Timestamp,
}

/// Settings a container is created with
#[derive(Debug, Clone)]
pub(crate) struct ContainerSettings {
    pub(crate) cost: CostModel,
    pub(crate) default_max_item_count: usize,
    pub(crate) etags: Arc<EtagSequence>,
}

/// A collection of documents partitioned by one key definition
pub struct Container {
    properties: ContainerProperties,
    lifecycle: Arc<Lifecycle>,
    partitions: PartitionMap,
    governor: Arc<Governor>,
    settings: ContainerSettings,
}

impl Container {
    /// Build a container in `Provisioning` state
    pub(crate) fn provision(
        database: &str,
        id: &str,
        definition: PartitionKeyDefinition,
        throughput: u32,
        governor: Governor,
        settings: ContainerSettings,
    ) -> Self {
        let router = PartitionRouter::for_throughput(definition.clone(), throughput);
        let properties = ContainerProperties {
            id: id.to_string(),
            database: database.to_string(),
            resource_id: Uuid::new_v4(),
            partition_key: definition,
            physical_partitions: router.physical_partitions(),
            created: Timestamp::now(),
        };
        Self {
            properties,
            lifecycle: Arc::new(Lifecycle::new(id)),
            partitions: PartitionMap::new(router, Arc::clone(&settings.etags)),
            governor: Arc::new(governor),
            settings,
        }
    }

    /// Container name
    pub fn id(&self) -> &str {
        &self.properties.id
    }

    /// Unique id of this container instance
    pub fn resource_id(&self) -> Uuid {
        self.properties.resource_id
    }

    /// Partition key definition
    pub fn partition_key(&self) -> &PartitionKeyDefinition {
        &self.properties.partition_key
    }

    /// Immutable properties
    pub fn properties(&self) -> &ContainerProperties {
        &self.properties
    }

    /// Current lifecycle state
    pub fn state(&self) -> ContainerState {
        self.lifecycle.state()
    }

    /// Number of logical partitions created so far
    pub fn partition_count(&self) -> usize {
        self.partitions.partition_count()
    }

    /// Total number of documents
    pub fn document_count(&self) -> usize {
        self.partitions.document_count()
    }

    /// The container's governor
    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    pub(crate) fn activate(&self) -> Result<()> {
        self.lifecycle.transition(ContainerState::Active)?;
        Ok(())
    }

    // ========================================================================
    // Throughput
    // ========================================================================

    /// Provisioned RU/s
    pub fn read_throughput(&self) -> Result<u32> {
        self.lifecycle.check_accepting()?;
        Ok(self.governor.throughput())
    }

    /// Change provisioned RU/s
    ///
    /// The container passes through `ThroughputScaling` while the budget is
    /// adjusted; requests keep being served meanwhile.
    pub fn replace_throughput(&self, throughput: u32) -> Result<()> {
        self.lifecycle.transition(ContainerState::ThroughputScaling)?;
        let result = self.governor.set_throughput(throughput);
        self.lifecycle.transition(ContainerState::Active)?;
        result
    }

    // ========================================================================
    // Item Operations
    // ========================================================================

    /// Insert a new document
    ///
    /// # Errors
    ///
    /// - `Conflict` if a document with the same id exists in the partition
    /// - `PartitionKeyMismatch` if the body's key differs from `partition_key`
    /// - `MissingPartitionKey` if the body lacks the key path
    /// - `Throttled` if the governor has no budget
    pub fn create_item<T: Serialize>(
        &self,
        item: &T,
        partition_key: &PartitionKey,
    ) -> Result<ItemResponse> {
        let _accepting = self.lifecycle.enter()?;
        let body = serde_json::to_value(item)?;
        let (id, size) = self.validate_body(&body, partition_key)?;
        let charge = self.settings.cost.write(size);
        self.governor.admit(charge).into_result()?;

        let stored = self
            .partitions
            .route_or_create(partition_key)
            .create(&id, body)?;
        debug!(
            target: "docstore::items",
            container = %self.id(),
            id = %id,
            partition_key = %partition_key,
            etag = %stored.etag(),
            "Item created"
        );
        Ok(ItemResponse::from_stored(&stored, charge))
    }

    /// Read a document by id
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    pub fn read_item(&self, id: &str, partition_key: &PartitionKey) -> Result<ItemResponse> {
        self.read_item_if_exists(id, partition_key)?
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))
    }

    /// Read a document by id, `Ok(None)` if absent
    ///
    /// A miss is still charged.
    pub fn read_item_if_exists(
        &self,
        id: &str,
        partition_key: &PartitionKey,
    ) -> Result<Option<ItemResponse>> {
        self.lifecycle.check_accepting()?;
        validate_id(id)?;
        self.partitions.router().check_shape(partition_key)?;

        let found = self
            .partitions
            .route(partition_key)
            .and_then(|partition| partition.get(id));
        let charge = match &found {
            Some(stored) => self.settings.cost.read(stored.size()),
            None => self.settings.cost.read_miss(),
        };
        self.governor.admit(charge).into_result()?;

        debug!(
            target: "docstore::items",
            container = %self.id(),
            id = %id,
            found = found.is_some(),
            "Item read"
        );
        Ok(found.map(|stored| ItemResponse::from_stored(&stored, charge)))
    }

    /// Replace an existing document
    ///
    /// With `if_match`, the replace only succeeds if the current ETag is
    /// equal; the new ETag is always strictly greater than the old one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if absent
    /// - `PreconditionFailed` on an ETag mismatch
    /// - `InvalidInput` if `id` differs from the body's `id`
    pub fn replace_item<T: Serialize>(
        &self,
        id: &str,
        item: &T,
        partition_key: &PartitionKey,
        if_match: Option<ETag>,
    ) -> Result<ItemResponse> {
        let _accepting = self.lifecycle.enter()?;
        let body = serde_json::to_value(item)?;
        let (body_id, size) = self.validate_body(&body, partition_key)?;
        if body_id != id {
            return Err(Error::invalid_input(format!(
                "replace of '{}' was given a document with id '{}'",
                id, body_id
            )));
        }
        let charge = self.settings.cost.write(size);
        self.governor.admit(charge).into_result()?;

        let partition = self
            .partitions
            .route(partition_key)
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))?;
        let stored = partition.replace(id, body, if_match)?;
        debug!(
            target: "docstore::items",
            container = %self.id(),
            id = %id,
            etag = %stored.etag(),
            "Item replaced"
        );
        Ok(ItemResponse::from_stored(&stored, charge))
    }

    /// Create the document, or replace it unconditionally if it exists
    pub fn upsert_item<T: Serialize>(
        &self,
        item: &T,
        partition_key: &PartitionKey,
    ) -> Result<(ItemResponse, UpsertOutcome)> {
        let _accepting = self.lifecycle.enter()?;
        let body = serde_json::to_value(item)?;
        let (id, size) = self.validate_body(&body, partition_key)?;
        let charge = self.settings.cost.write(size);
        self.governor.admit(charge).into_result()?;

        let (stored, outcome) = self.partitions.route_or_create(partition_key).upsert(&id, body);
        debug!(
            target: "docstore::items",
            container = %self.id(),
            id = %id,
            outcome = ?outcome,
            etag = %stored.etag(),
            "Item upserted"
        );
        Ok((ItemResponse::from_stored(&stored, charge), outcome))
    }

    /// Delete a document
    ///
    /// Returns the charge. With `if_match`, only deletes if the current
    /// ETag is equal.
    pub fn delete_item(
        &self,
        id: &str,
        partition_key: &PartitionKey,
        if_match: Option<ETag>,
    ) -> Result<RequestCharge> {
        let _accepting = self.lifecycle.enter()?;
        validate_id(id)?;
        self.partitions.router().check_shape(partition_key)?;
        let charge = self.settings.cost.delete();
        self.governor.admit(charge).into_result()?;

        let partition = self
            .partitions
            .route(partition_key)
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))?;
        let removed = partition.delete(id, if_match)?;
        debug!(
            target: "docstore::items",
            container = %self.id(),
            id = %id,
            etag = %removed.etag(),
            "Item deleted"
        );
        Ok(charge)
    }

    /// Typed read
    pub fn read_item_as<T: serde::de::DeserializeOwned>(
        &self,
        id: &str,
        partition_key: &PartitionKey,
    ) -> Result<T> {
        self.read_item(id, partition_key)?.resource()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Start a query
    ///
    /// Accepts query text, a [`QueryDefinition`](crate::QueryDefinition)
    /// with parameters, or a [`Predicate`](crate::Predicate). The scan is
    /// restricted to one logical partition when `options.partition_key` is
    /// set or the predicate fixes every partition key path by equality.
    pub fn query_items(
        &self,
        query: impl Into<QuerySpec>,
        options: QueryOptions,
    ) -> Result<QueryIterator> {
        self.lifecycle.check_accepting()?;
        let predicate = query.into().into_predicate()?;

        let target = match options.partition_key {
            Some(key) => {
                self.partitions.router().check_shape(&key)?;
                Some(key)
            }
            None => predicate.partition_key(self.partition_key()),
        };
        let partitions: Vec<Arc<LogicalPartition>> = match &target {
            Some(key) => self.partitions.route(key).into_iter().collect(),
            None => self.partitions.partitions_ordered(),
        };
        let max_item_count = options
            .max_item_count
            .unwrap_or(self.settings.default_max_item_count);

        debug!(
            target: "docstore::query",
            container = %self.id(),
            predicate = %predicate,
            partition_key = ?target.as_ref().map(|k| k.to_string()),
            partitions = partitions.len(),
            "Query started"
        );
        Ok(QueryIterator::new(
            self.id().to_string(),
            Arc::clone(&self.lifecycle),
            Arc::clone(&self.governor),
            self.settings.cost.clone(),
            partitions,
            predicate,
            max_item_count,
        ))
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Drive the container through `Deleting -> Deleted`, dropping all data
    ///
    /// Returns the number of documents removed.
    pub(crate) fn tear_down(&self) -> Result<usize> {
        self.lifecycle.transition(ContainerState::Deleting)?;
        let removed = self.partitions.clear();
        self.lifecycle.transition(ContainerState::Deleted)?;
        Ok(removed)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check a document body against the caller's partition key
    ///
    /// Returns the document id and serialized size.
    fn validate_body(&self, body: &Value, partition_key: &PartitionKey) -> Result<(String, usize)> {
        let id = document_id(body)?.to_string();
        let size = validate_size(body)?;
        let router = self.partitions.router();
        router.check_shape(partition_key)?;

        let explicit_none = partition_key
            .components()
            .iter()
            .any(|c| *c == PartitionKeyComponent::Undefined);
        let actual = if explicit_none {
            router.resolve_lenient(body)?
        } else {
            router.resolve(body)?
        };
        if &actual != partition_key {
            return Err(Error::PartitionKeyMismatch {
                supplied: partition_key.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok((id, size))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.properties.id)
            .field("database", &self.properties.database)
            .field("resource_id", &self.properties.resource_id)
            .field("partition_key", &self.properties.partition_key.to_string())
            .field("state", &self.state())
            .finish()
    }
}
