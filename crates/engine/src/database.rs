//! Databases
//!
//! A [`Database`] is a named set of containers. Container creation is
//! idempotent: asking for an existing container returns the same handle
//! with [`CreateStatus::Existing`].

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docstore_core::document::validate_resource_id;
use docstore_core::{EntityKind, Error, PartitionKeyDefinition, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::catalog::EngineSettings;
use crate::container::{Container, ContainerProperties, ContainerSettings};
use crate::response::{CreateResponse, CreateStatus};
use crate::throughput::Governor;

/// Immutable description of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseProperties {
    /// Database name
    pub id: String,
    /// Unique id of this database instance
    pub resource_id: Uuid,
    /// Creation time
    pub created: Timestamp,
}

/// A named collection of containers
pub struct Database {
    properties: DatabaseProperties,
    containers: DashMap<String, Arc<Container>>,
    settings: Arc<EngineSettings>,
    deleted: AtomicBool,
}

impl Database {
    pub(crate) fn new(id: &str, settings: Arc<EngineSettings>) -> Self {
        Self {
            properties: DatabaseProperties {
                id: id.to_string(),
                resource_id: Uuid::new_v4(),
                created: Timestamp::now(),
            },
            containers: DashMap::new(),
            settings,
            deleted: AtomicBool::new(false),
        }
    }

    /// Database name
    pub fn id(&self) -> &str {
        &self.properties.id
    }

    /// Unique id of this database instance
    pub fn resource_id(&self) -> Uuid {
        self.properties.resource_id
    }

    /// Immutable properties
    pub fn properties(&self) -> &DatabaseProperties {
        &self.properties
    }

    fn check_live(&self) -> Result<()> {
        if self.deleted.load(Ordering::Acquire) {
            return Err(Error::not_found(EntityKind::Database, self.id()));
        }
        Ok(())
    }

    /// Create a container unless one with this id exists
    ///
    /// `partition_key` is a slash path (`/LastName`) or a comma-separated
    /// list of up to three paths for a hierarchical key.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the id, path or throughput is invalid, or if the
    /// container exists with a different partition key.
    pub fn create_container_if_not_exists(
        &self,
        id: &str,
        partition_key: &str,
        throughput: u32,
    ) -> Result<CreateResponse<Container>> {
        let definition: PartitionKeyDefinition = partition_key.parse()?;
        self.create_container_with_definition(id, definition, throughput)
    }

    /// Create a container from an already-built partition key definition
    pub fn create_container_with_definition(
        &self,
        id: &str,
        definition: PartitionKeyDefinition,
        throughput: u32,
    ) -> Result<CreateResponse<Container>> {
        self.check_live()?;
        validate_resource_id(id)?;

        match self.containers.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                let existing = Arc::clone(entry.get());
                if existing.partition_key() != &definition {
                    return Err(Error::invalid_input(format!(
                        "container '{}' exists with partition key {}, requested {}",
                        id,
                        existing.partition_key(),
                        definition
                    )));
                }
                Ok(CreateResponse {
                    resource: existing,
                    status: CreateStatus::Existing,
                })
            }
            Entry::Vacant(entry) => {
                let governor = Governor::new(
                    throughput,
                    self.settings.throughput_window,
                    Arc::clone(&self.settings.clock),
                )?;
                let container = Container::provision(
                    self.id(),
                    id,
                    definition,
                    throughput,
                    governor,
                    ContainerSettings {
                        cost: self.settings.cost.clone(),
                        default_max_item_count: self.settings.default_max_item_count,
                        etags: Arc::clone(&self.settings.etags),
                    },
                );
                container.activate()?;
                let container = Arc::new(container);
                entry.insert(Arc::clone(&container));
                info!(
                    target: "docstore::catalog",
                    database = %self.id(),
                    container = %id,
                    partition_key = %container.partition_key(),
                    throughput,
                    physical_partitions = container.properties().physical_partitions,
                    "Container created"
                );
                Ok(CreateResponse {
                    resource: container,
                    status: CreateStatus::Created,
                })
            }
        }
    }

    /// Look up a container
    pub fn container(&self, id: &str) -> Result<Arc<Container>> {
        self.check_live()?;
        self.containers
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(EntityKind::Container, id))
    }

    /// Properties of every container, sorted by id
    pub fn list_containers(&self) -> Result<Vec<ContainerProperties>> {
        self.check_live()?;
        let mut containers: Vec<_> = self
            .containers
            .iter()
            .map(|entry| entry.value().properties().clone())
            .collect();
        containers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(containers)
    }

    /// Delete a container and all of its documents
    ///
    /// The container is unreachable from this database before its data is
    /// dropped; handles held elsewhere report `NotFound`.
    pub fn delete_container(&self, id: &str) -> Result<()> {
        self.check_live()?;
        let (_, container) = self
            .containers
            .remove(id)
            .ok_or_else(|| Error::not_found(EntityKind::Container, id))?;
        let documents = container.tear_down()?;
        info!(
            target: "docstore::catalog",
            database = %self.id(),
            container = %id,
            documents,
            "Container deleted"
        );
        Ok(())
    }

    /// Mark deleted and tear down every container; returns documents removed
    pub(crate) fn tear_down(&self) -> Result<usize> {
        self.deleted.store(true, Ordering::Release);
        let ids: Vec<String> = self.containers.iter().map(|e| e.key().clone()).collect();
        let mut documents = 0;
        for id in ids {
            if let Some((_, container)) = self.containers.remove(&id) {
                documents += container.tear_down()?;
            }
        }
        Ok(documents)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.properties.id)
            .field("resource_id", &self.properties.resource_id)
            .field("containers", &self.containers.len())
            .finish()
    }
}
