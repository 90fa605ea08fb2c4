//! Client entry point

use docstore_core::Result;
use docstore_storage::EtagSequence;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::catalog::{Catalog, EngineSettings};
use crate::config::ClientConfig;
use crate::cost::CostModel;
use crate::database::{Database, DatabaseProperties};
use crate::response::CreateResponse;
use crate::throughput::{Clock, SystemClock};

/// Handle to a document store account
///
/// Each client owns its own catalog; two clients never share databases.
///
/// # Example
///
/// ```
/// use docstore_engine::{ClientConfig, DocumentClient};
/// use docstore_core::PartitionKey;
/// use serde_json::json;
///
/// let client = DocumentClient::new(ClientConfig::new("https://localhost:8081", "key"))?;
/// let db = client.create_database_if_not_exists("FamilyDatabase")?;
/// let container = db.create_container_if_not_exists("FamilyContainer", "/LastName", 400)?;
///
/// let item = json!({"id": "Andersen.1", "LastName": "Andersen"});
/// let created = container.create_item(&item, &PartitionKey::from("Andersen"))?;
/// println!("created with etag {} for {}", created.etag, created.request_charge);
/// # Ok::<(), docstore_core::Error>(())
/// ```
#[derive(Debug)]
pub struct DocumentClient {
    config: ClientConfig,
    catalog: Catalog,
}

impl DocumentClient {
    /// Create a client on the system clock
    ///
    /// # Errors
    ///
    /// `Config` if the configuration fails validation.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client whose governors read time from `clock`
    pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_cost_model(config, clock, CostModel::default())
    }

    /// Create a client with a custom clock and cost model
    pub fn with_cost_model(
        config: ClientConfig,
        clock: Arc<dyn Clock>,
        cost: CostModel,
    ) -> Result<Self> {
        config.validate()?;
        let settings = EngineSettings {
            cost,
            default_max_item_count: config.default_max_item_count,
            throughput_window: config.throughput_window(),
            clock,
            etags: Arc::new(EtagSequence::new()),
        };
        info!(
            target: "docstore::catalog",
            endpoint = %config.endpoint,
            application = config.application_name.as_deref().unwrap_or(""),
            "Client created"
        );
        Ok(Self {
            config,
            catalog: Catalog::new(settings),
        })
    }

    /// Create a client from a TOML config file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Self::new(ClientConfig::from_file(path)?)
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The catalog of databases
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Create a database unless one with this id exists
    pub fn create_database_if_not_exists(&self, id: &str) -> Result<CreateResponse<Database>> {
        self.catalog.create_database_if_not_exists(id)
    }

    /// Look up a database
    pub fn database(&self, id: &str) -> Result<Arc<Database>> {
        self.catalog.database(id)
    }

    /// Properties of a database
    pub fn read_database(&self, id: &str) -> Result<DatabaseProperties> {
        self.catalog.read_database(id)
    }

    /// Properties of every database
    pub fn list_databases(&self) -> Vec<DatabaseProperties> {
        self.catalog.list_databases()
    }

    /// Delete a database and everything in it
    pub fn delete_database(&self, id: &str) -> Result<()> {
        self.catalog.delete_database(id)
    }
}
