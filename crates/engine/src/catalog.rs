//! Database catalog
//!
//! The [`Catalog`] owns every database of one client. Databases are held in
//! a `DashMap`, and each database holds its containers the same way, so
//! lookups on different entries never contend.
//!
//! Deletion removes the catalog entry first and only then tears down the
//! database's containers. Concurrent lookups either find the complete
//! database or get `NotFound`; a half-deleted database is never reachable.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docstore_core::document::validate_resource_id;
use docstore_core::{EntityKind, Error, Result};
use docstore_storage::EtagSequence;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{DEFAULT_MAX_ITEM_COUNT, DEFAULT_THROUGHPUT_WINDOW_MS};
use crate::cost::CostModel;
use crate::database::{Database, DatabaseProperties};
use crate::response::{CreateResponse, CreateStatus};
use crate::throughput::{Clock, SystemClock};

/// Settings shared by every container a catalog creates
#[derive(Debug, Clone)]
pub(crate) struct EngineSettings {
    pub(crate) cost: CostModel,
    pub(crate) default_max_item_count: usize,
    pub(crate) throughput_window: Duration,
    pub(crate) clock: Arc<dyn Clock>,
    /// ETag source for every container, so a re-created container never
    /// reissues an ETag of its previous incarnation
    pub(crate) etags: Arc<EtagSequence>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cost: CostModel::default(),
            default_max_item_count: DEFAULT_MAX_ITEM_COUNT,
            throughput_window: Duration::from_millis(DEFAULT_THROUGHPUT_WINDOW_MS),
            clock: Arc::new(SystemClock),
            etags: Arc::new(EtagSequence::new()),
        }
    }
}

/// All databases of one client
#[derive(Debug)]
pub struct Catalog {
    databases: DashMap<String, Arc<Database>>,
    settings: Arc<EngineSettings>,
}

impl Catalog {
    pub(crate) fn new(settings: EngineSettings) -> Self {
        Self {
            databases: DashMap::new(),
            settings: Arc::new(settings),
        }
    }

    /// Create a database unless one with this id exists
    pub fn create_database_if_not_exists(&self, id: &str) -> Result<CreateResponse<Database>> {
        validate_resource_id(id)?;
        match self.databases.entry(id.to_string()) {
            Entry::Occupied(entry) => Ok(CreateResponse {
                resource: Arc::clone(entry.get()),
                status: CreateStatus::Existing,
            }),
            Entry::Vacant(entry) => {
                let database = Arc::new(Database::new(id, Arc::clone(&self.settings)));
                entry.insert(Arc::clone(&database));
                info!(
                    target: "docstore::catalog",
                    database = %id,
                    resource_id = %database.resource_id(),
                    "Database created"
                );
                Ok(CreateResponse {
                    resource: database,
                    status: CreateStatus::Created,
                })
            }
        }
    }

    /// Look up a database
    pub fn database(&self, id: &str) -> Result<Arc<Database>> {
        self.databases
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found(EntityKind::Database, id))
    }

    /// Properties of a database
    pub fn read_database(&self, id: &str) -> Result<DatabaseProperties> {
        Ok(self.database(id)?.properties().clone())
    }

    /// Properties of every database, sorted by id
    pub fn list_databases(&self) -> Vec<DatabaseProperties> {
        let mut databases: Vec<_> = self
            .databases
            .iter()
            .map(|entry| entry.value().properties().clone())
            .collect();
        databases.sort_by(|a, b| a.id.cmp(&b.id));
        databases
    }

    /// Delete a database with all of its containers and documents
    pub fn delete_database(&self, id: &str) -> Result<()> {
        let (_, database) = self
            .databases
            .remove(id)
            .ok_or_else(|| Error::not_found(EntityKind::Database, id))?;
        let documents = database.tear_down()?;
        info!(
            target: "docstore::catalog",
            database = %id,
            documents,
            "Database deleted"
        );
        Ok(())
    }
}
