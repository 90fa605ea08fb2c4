//! Operation results
//!
//! Item operations return an [`ItemResponse`]; query pages are
//! [`FeedPage`]s; idempotent creates report a [`CreateStatus`].

use docstore_core::{ETag, Result, Timestamp};
use docstore_storage::StoredDocument;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;

use crate::cost::RequestCharge;

/// A document with its system metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResponse {
    /// Document body as stored
    pub document: Arc<Value>,
    /// Version token of this body
    pub etag: ETag,
    /// Units charged for the operation
    pub request_charge: RequestCharge,
    /// When this version was written
    pub timestamp: Timestamp,
}

impl ItemResponse {
    pub(crate) fn from_stored(stored: &StoredDocument, request_charge: RequestCharge) -> Self {
        Self {
            document: stored.body_arc(),
            etag: stored.etag(),
            request_charge,
            timestamp: stored.timestamp(),
        }
    }

    /// The document body
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Deserialize the body into `T`
    pub fn resource<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(self.document.as_ref())?)
    }
}

/// One page of query results
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    /// Matching documents in scan order
    pub items: Vec<Value>,
    /// Units charged for this page
    pub request_charge: RequestCharge,
    /// Documents the filter was evaluated against
    pub documents_examined: usize,
    /// False on the last page
    pub has_more_results: bool,
}

impl FeedPage {
    /// Number of items on the page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the page carries no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Deserialize every item into `T`
    pub fn resources<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.items
            .iter()
            .map(|item| Ok(T::deserialize(item)?))
            .collect()
    }
}

/// Whether an idempotent create made something new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStatus {
    /// Newly created
    Created,
    /// Already existed; returned unchanged
    Existing,
}

/// Result of a `create_*_if_not_exists` call
#[derive(Debug, Clone)]
pub struct CreateResponse<T> {
    /// The entity
    pub resource: Arc<T>,
    /// Created or existing
    pub status: CreateStatus,
}

impl<T> CreateResponse<T> {
    /// True if this call created the entity
    pub fn created(&self) -> bool {
        self.status == CreateStatus::Created
    }

    /// Take the entity handle
    pub fn into_inner(self) -> Arc<T> {
        self.resource
    }
}

impl<T> Deref for CreateResponse<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.resource
    }
}
