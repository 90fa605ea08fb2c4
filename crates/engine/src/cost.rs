//! Request unit cost model
//!
//! Every operation is charged in request units (RU) against the
//! container's throughput budget.
//!
//! | Operation | Charge |
//! |-----------|--------|
//! | Point read | 1.0 + 1.0 per KiB beyond the first |
//! | Create / replace / upsert | 5.0 + 1.0 per KiB |
//! | Delete | 5.0 |
//! | Query page | 2.5 + 0.05 per document examined + 0.5 per document returned |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

const KIB: usize = 1024;

/// A charge in request units
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RequestCharge(f64);

impl RequestCharge {
    /// Zero charge
    pub const ZERO: RequestCharge = RequestCharge(0.0);

    /// Wrap a raw RU value
    pub const fn new(units: f64) -> Self {
        RequestCharge(units)
    }

    /// Raw RU value
    pub fn units(&self) -> f64 {
        self.0
    }
}

impl Add for RequestCharge {
    type Output = RequestCharge;

    fn add(self, rhs: Self) -> Self::Output {
        RequestCharge(self.0 + rhs.0)
    }
}

impl AddAssign for RequestCharge {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for RequestCharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} RU", self.0)
    }
}

/// Charges for each kind of operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Base charge of a point read
    pub read_base: f64,
    /// Added per KiB beyond the first on reads
    pub read_per_extra_kib: f64,
    /// Base charge of create/replace/upsert
    pub write_base: f64,
    /// Added per KiB on writes
    pub write_per_kib: f64,
    /// Charge of a delete
    pub delete: f64,
    /// Base charge of one query page
    pub query_page_base: f64,
    /// Added per document examined by a page
    pub query_per_examined: f64,
    /// Added per document returned by a page
    pub query_per_returned: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            read_base: 1.0,
            read_per_extra_kib: 1.0,
            write_base: 5.0,
            write_per_kib: 1.0,
            delete: 5.0,
            query_page_base: 2.5,
            query_per_examined: 0.05,
            query_per_returned: 0.5,
        }
    }
}

impl CostModel {
    /// Point read of a document serialized to `size` bytes
    pub fn read(&self, size: usize) -> RequestCharge {
        let extra = kib_ceil(size).saturating_sub(1);
        RequestCharge(self.read_base + self.read_per_extra_kib * extra as f64)
    }

    /// Point read that found nothing
    pub fn read_miss(&self) -> RequestCharge {
        RequestCharge(self.read_base)
    }

    /// Create, replace or upsert of a document serialized to `size` bytes
    pub fn write(&self, size: usize) -> RequestCharge {
        RequestCharge(self.write_base + self.write_per_kib * kib_ceil(size) as f64)
    }

    /// Delete of one document
    pub fn delete(&self) -> RequestCharge {
        RequestCharge(self.delete)
    }

    /// One query page
    pub fn query_page(&self, examined: usize, returned: usize) -> RequestCharge {
        RequestCharge(
            self.query_page_base
                + self.query_per_examined * examined as f64
                + self.query_per_returned * returned as f64,
        )
    }
}

fn kib_ceil(size: usize) -> usize {
    (size + KIB - 1) / KIB
}
