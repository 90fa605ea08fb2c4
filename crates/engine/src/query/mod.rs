//! Filtered queries over a container
//!
//! Queries are a `SELECT * FROM c WHERE ...` text form or a [`Predicate`]
//! built in code. Either way the container turns them into a
//! [`QueryIterator`] that yields one [`FeedPage`](crate::FeedPage) at a time.

mod iterator;
mod parser;
mod predicate;

pub use iterator::{QueryIterator, QueryMetrics};
pub use parser::parse_query;
pub use predicate::{CompareOp, Comparison, Predicate};

use docstore_core::{PartitionKey, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query text plus parameter bindings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDefinition {
    text: String,
    parameters: Vec<(String, Value)>,
}

impl QueryDefinition {
    /// Query with no parameters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    /// Bind `@name` to a value; the leading `@` is optional
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Query text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bound parameters in insertion order
    pub fn parameters(&self) -> &[(String, Value)] {
        &self.parameters
    }

    /// Parse into a predicate
    pub fn to_predicate(&self) -> Result<Predicate> {
        parse_query(&self.text, &self.parameters)
    }
}

impl From<&str> for QueryDefinition {
    fn from(text: &str) -> Self {
        QueryDefinition::new(text)
    }
}

impl From<String> for QueryDefinition {
    fn from(text: String) -> Self {
        QueryDefinition::new(text)
    }
}

/// Anything a container can query with
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    /// Text form, parsed when the iterator is created
    Text(QueryDefinition),
    /// Pre-built predicate
    Predicate(Predicate),
}

impl QuerySpec {
    /// Resolve into a predicate
    pub fn into_predicate(self) -> Result<Predicate> {
        match self {
            QuerySpec::Text(definition) => definition.to_predicate(),
            QuerySpec::Predicate(predicate) => Ok(predicate),
        }
    }
}

impl From<QueryDefinition> for QuerySpec {
    fn from(definition: QueryDefinition) -> Self {
        QuerySpec::Text(definition)
    }
}

impl From<&str> for QuerySpec {
    fn from(text: &str) -> Self {
        QuerySpec::Text(QueryDefinition::new(text))
    }
}

impl From<String> for QuerySpec {
    fn from(text: String) -> Self {
        QuerySpec::Text(QueryDefinition::new(text))
    }
}

impl From<Predicate> for QuerySpec {
    fn from(predicate: Predicate) -> Self {
        QuerySpec::Predicate(predicate)
    }
}

/// Per-query options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Results per page; the client default applies when `None`
    pub max_item_count: Option<usize>,
    /// Restrict the query to one logical partition
    pub partition_key: Option<PartitionKey>,
}

impl QueryOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size
    pub fn with_max_item_count(mut self, count: usize) -> Self {
        self.max_item_count = Some(count);
        self
    }

    /// Target a single logical partition
    pub fn with_partition_key(mut self, key: impl Into<PartitionKey>) -> Self {
        self.partition_key = Some(key.into());
        self
    }
}
