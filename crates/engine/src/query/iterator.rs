//! Page-by-page query cursor

use docstore_core::Result;
use docstore_storage::LogicalPartition;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::Predicate;
use crate::container::Lifecycle;
use crate::cost::{CostModel, RequestCharge};
use crate::response::FeedPage;
use crate::throughput::Governor;

/// Work done by a query so far
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueryMetrics {
    /// Documents the predicate was evaluated against
    pub documents_examined: usize,
    /// Documents returned
    pub documents_returned: usize,
    /// Logical partitions the scan entered
    pub partitions_visited: usize,
    /// Pages returned
    pub pages: usize,
    /// Sum of page charges
    pub request_charge: RequestCharge,
}

/// Where the next page starts
#[derive(Debug, Clone, Default)]
struct Cursor {
    partition: usize,
    resume_after: Option<String>,
}

/// Lazy cursor over the results of one query
///
/// Each call to [`next_page`](Self::next_page) scans forward from the
/// recorded position until the page is full, holding a partition's read
/// lock only while that partition is being scanned. Documents written
/// between pages are seen if they sort after the cursor.
///
/// The page is charged after it is assembled. When the container's
/// governor throttles, the page is dropped and the cursor stays put, so
/// calling `next_page` again retries the same page.
pub struct QueryIterator {
    container: String,
    lifecycle: Arc<Lifecycle>,
    governor: Arc<Governor>,
    cost: CostModel,
    partitions: Vec<Arc<LogicalPartition>>,
    predicate: Predicate,
    max_item_count: usize,
    cursor: Cursor,
    started: bool,
    metrics: QueryMetrics,
}

impl QueryIterator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        container: String,
        lifecycle: Arc<Lifecycle>,
        governor: Arc<Governor>,
        cost: CostModel,
        partitions: Vec<Arc<LogicalPartition>>,
        predicate: Predicate,
        max_item_count: usize,
    ) -> Self {
        Self {
            container,
            lifecycle,
            governor,
            cost,
            partitions,
            predicate,
            max_item_count: max_item_count.max(1),
            cursor: Cursor::default(),
            started: false,
            metrics: QueryMetrics::default(),
        }
    }

    /// The filter being applied
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Number of logical partitions in scope
    pub fn partitions_in_scope(&self) -> usize {
        self.partitions.len()
    }

    /// Work done so far
    pub fn metrics(&self) -> QueryMetrics {
        self.metrics
    }

    /// True until the last page has been returned
    ///
    /// The first page is always produced, even when it is empty.
    pub fn has_more_results(&self) -> bool {
        !self.started || self.cursor.partition < self.partitions.len()
    }

    /// Fetch the next page
    ///
    /// Returns `None` once drained. A throttled page is returned as
    /// `Some(Err(Error::Throttled { .. }))` without advancing.
    pub fn next_page(&mut self) -> Option<Result<FeedPage>> {
        if !self.has_more_results() {
            return None;
        }
        if let Err(e) = self.lifecycle.check_accepting() {
            return Some(Err(e));
        }

        let mut cursor = self.cursor.clone();
        let mut items: Vec<Value> = Vec::new();
        let mut examined = 0;
        let mut visited = 0;

        while items.len() < self.max_item_count && cursor.partition < self.partitions.len() {
            let partition = &self.partitions[cursor.partition];
            if cursor.resume_after.is_none() {
                visited += 1;
            }
            let predicate = &self.predicate;
            let batch = partition.scan(
                cursor.resume_after.as_deref(),
                self.max_item_count - items.len(),
                |doc| predicate.matches(doc),
            );
            examined += batch.examined;
            items.extend(batch.matches.iter().map(|stored| stored.body().clone()));
            if batch.exhausted {
                cursor.partition += 1;
                cursor.resume_after = None;
            } else {
                cursor.resume_after = batch.resume_after;
            }
        }

        let charge = self.cost.query_page(examined, items.len());
        if let Err(e) = self.governor.admit(charge).into_result() {
            return Some(Err(e));
        }

        self.started = true;
        self.cursor = cursor;
        self.metrics.documents_examined += examined;
        self.metrics.documents_returned += items.len();
        self.metrics.partitions_visited += visited;
        self.metrics.pages += 1;
        self.metrics.request_charge += charge;

        let has_more_results = self.has_more_results();
        debug!(
            target: "docstore::query",
            container = %self.container,
            returned = items.len(),
            examined,
            charge = charge.units(),
            has_more_results,
            "Query page"
        );
        Some(Ok(FeedPage {
            items,
            request_charge: charge,
            documents_examined: examined,
            has_more_results,
        }))
    }

    /// Drain every remaining page and return all items in order
    ///
    /// Stops at the first error, including throttling.
    pub fn collect_items(mut self) -> Result<Vec<Value>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page() {
            all.extend(page?.items);
        }
        Ok(all)
    }
}

impl Iterator for QueryIterator {
    type Item = Result<FeedPage>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page()
    }
}

impl std::fmt::Debug for QueryIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryIterator")
            .field("container", &self.container)
            .field("predicate", &self.predicate.to_string())
            .field("partitions", &self.partitions.len())
            .field("max_item_count", &self.max_item_count)
            .field("metrics", &self.metrics)
            .finish()
    }
}
