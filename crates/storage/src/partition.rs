//! Logical partitions
//!
//! A [`LogicalPartition`] holds every document sharing one partition key
//! value, as an ordered map from document id to [`StoredDocument`].
//!
//! # Thread Safety
//!
//! The map is guarded by a `parking_lot::RwLock`:
//! - create/replace/upsert/delete take the write lock, so mutations within
//!   one partition are serialized and either fully apply or leave the map
//!   untouched
//! - reads share the read lock and clone an `Arc` to the document body, so
//!   a reader never observes a half-written document
//! - different partitions never contend
//!
//! ETags come from a container-wide [`EtagSequence`] and are drawn while the
//! write lock is held, so they increase in mutation order within a partition.

use docstore_core::document::serialized_size;
use docstore_core::{ETag, EntityKind, Error, PartitionKey, Result, Timestamp};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::router::Placement;

/// Monotonically increasing ETag source, shared by every container of a catalog
#[derive(Debug, Default)]
pub struct EtagSequence {
    last: AtomicU64,
}

impl EtagSequence {
    /// Create a sequence whose first ETag is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the next ETag
    #[inline]
    pub fn next(&self) -> ETag {
        ETag::from_raw(self.last.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Most recently issued ETag value (0 if none)
    pub fn current(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

/// A document as held by a logical partition
///
/// The body is shared behind an `Arc`, so handing a copy to a reader is a
/// reference count bump.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    body: Arc<Value>,
    etag: ETag,
    timestamp: Timestamp,
    size: usize,
}

impl StoredDocument {
    fn new(body: Value, etag: ETag) -> Self {
        StoredDocument {
            size: serialized_size(&body),
            body: Arc::new(body),
            etag,
            timestamp: Timestamp::now(),
        }
    }

    /// The JSON body
    #[inline]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Shared handle to the body
    pub fn body_arc(&self) -> Arc<Value> {
        Arc::clone(&self.body)
    }

    /// Current version token
    #[inline]
    pub fn etag(&self) -> ETag {
        self.etag
    }

    /// When this version was written
    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Compact JSON size of the body in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Whether an upsert created or replaced the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No document with the id existed
    Created,
    /// An existing document was overwritten
    Replaced,
}

/// One bounded pass over a partition, used by the query executor
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    /// Documents accepted by the filter, in id order
    pub matches: Vec<StoredDocument>,
    /// Number of documents the filter was evaluated against
    pub examined: usize,
    /// Id of the last document examined; resume strictly after it
    pub resume_after: Option<String>,
    /// True when the scan reached the end of the partition
    pub exhausted: bool,
}

/// All documents sharing one partition key value
pub struct LogicalPartition {
    key: PartitionKey,
    placement: Placement,
    etags: Arc<EtagSequence>,
    items: RwLock<BTreeMap<String, StoredDocument>>,
}

impl LogicalPartition {
    /// Create an empty partition
    pub fn new(key: PartitionKey, placement: Placement, etags: Arc<EtagSequence>) -> Self {
        Self {
            key,
            placement,
            etags,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// Partition key value shared by every document here
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    /// Placement computed by the router
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// True if the partition holds no documents
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    // ========================================================================
    // Item Operations
    // ========================================================================

    /// Insert a new document
    ///
    /// Fails with `Conflict` if the id already exists.
    pub fn create(&self, id: &str, body: Value) -> Result<StoredDocument> {
        let mut items = self.items.write();
        if items.contains_key(id) {
            return Err(Error::conflict(EntityKind::Document, id));
        }
        let stored = StoredDocument::new(body, self.etags.next());
        items.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    /// Read a document
    pub fn read(&self, id: &str) -> Result<StoredDocument> {
        self.get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))
    }

    /// Read a document, `None` if absent
    pub fn get(&self, id: &str) -> Option<StoredDocument> {
        self.items.read().get(id).cloned()
    }

    /// Replace an existing document
    ///
    /// Fails with `NotFound` if the id is absent and with
    /// `PreconditionFailed` if `if_match` is given and differs from the
    /// current ETag. On success the document gets a new, greater ETag.
    pub fn replace(&self, id: &str, body: Value, if_match: Option<ETag>) -> Result<StoredDocument> {
        let mut items = self.items.write();
        let current = items
            .get_mut(id)
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))?;
        check_if_match(id, current.etag, if_match)?;
        *current = StoredDocument::new(body, self.etags.next());
        Ok(current.clone())
    }

    /// Create or unconditionally replace a document
    pub fn upsert(&self, id: &str, body: Value) -> (StoredDocument, UpsertOutcome) {
        let mut items = self.items.write();
        let stored = StoredDocument::new(body, self.etags.next());
        let outcome = match items.insert(id.to_string(), stored.clone()) {
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Created,
        };
        (stored, outcome)
    }

    /// Remove a document, returning its last stored version
    ///
    /// Fails with `NotFound` if absent and `PreconditionFailed` on an
    /// `if_match` mismatch.
    pub fn delete(&self, id: &str, if_match: Option<ETag>) -> Result<StoredDocument> {
        let mut items = self.items.write();
        let current = items
            .get(id)
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))?;
        check_if_match(id, current.etag, if_match)?;
        items
            .remove(id)
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))
    }

    /// Remove every document, returning how many were dropped
    pub fn clear(&self) -> usize {
        let mut items = self.items.write();
        let count = items.len();
        items.clear();
        count
    }

    // ========================================================================
    // Scans
    // ========================================================================

    /// Scan documents in id order, strictly after `after`
    ///
    /// Stops once `max_matches` documents have passed `filter` or the end
    /// of the partition is reached. The read lock is held only for the
    /// duration of this call.
    pub fn scan<F>(&self, after: Option<&str>, max_matches: usize, mut filter: F) -> ScanBatch
    where
        F: FnMut(&Value) -> bool,
    {
        let items = self.items.read();
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };

        let mut batch = ScanBatch::default();
        let mut range = items.range::<str, _>((lower, Bound::Unbounded));
        loop {
            if batch.matches.len() >= max_matches {
                batch.exhausted = range.next().is_none();
                break;
            }
            match range.next() {
                Some((id, stored)) => {
                    batch.examined += 1;
                    batch.resume_after = Some(id.clone());
                    if filter(stored.body()) {
                        batch.matches.push(stored.clone());
                    }
                }
                None => {
                    batch.exhausted = true;
                    break;
                }
            }
        }
        batch
    }
}

impl std::fmt::Debug for LogicalPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicalPartition")
            .field("key", &self.key)
            .field("placement", &self.placement)
            .field("len", &self.len())
            .finish()
    }
}

fn check_if_match(id: &str, current: ETag, if_match: Option<ETag>) -> Result<()> {
    match if_match {
        Some(expected) if expected != current => Err(Error::PreconditionFailed {
            id: id.to_string(),
            expected,
            actual: current,
        }),
        _ => Ok(()),
    }
}
