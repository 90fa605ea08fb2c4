//! Filter predicates
//!
//! A [`Predicate`] is a conjunction of [`Comparison`]s. The empty
//! conjunction matches every document.
//!
//! Comparison rules:
//! - numbers compare numerically, strings lexicographically, booleans
//!   `false < true`, and `null` only equals `null`
//! - arrays and objects support `=` and `!=` by structural equality
//! - a missing field, or operands of different JSON types, never match,
//!   `!=` included

use docstore_core::{FieldPath, PartitionKey, PartitionKeyComponent, PartitionKeyDefinition, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=` or `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// `field OP literal`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Field path relative to the document root
    pub path: FieldPath,
    /// Operator
    pub op: CompareOp,
    /// Literal operand
    pub value: Value,
}

impl Comparison {
    /// Create a comparison
    pub fn new(path: FieldPath, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            path,
            op,
            value: value.into(),
        }
    }

    /// Evaluate against a document
    pub fn matches(&self, doc: &Value) -> bool {
        match self.path.resolve(doc) {
            Some(field) => compare(field, self.op, &self.value),
            None => false,
        }
    }
}

fn compare(field: &Value, op: CompareOp, literal: &Value) -> bool {
    let ordering = match (field, literal) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            return match op {
                CompareOp::Eq => field == literal,
                CompareOp::Ne => field != literal,
                _ => false,
            };
        }
        _ => None,
    };
    ordering.map_or(false, |ordering| op.accepts(ordering))
}

/// Conjunction of comparisons
///
/// Built from query text by the parser, or in code:
///
/// ```
/// use docstore_engine::query::Predicate;
///
/// let predicate = Predicate::eq("LastName", "Andersen")?
///     .and(Predicate::gt("Children[0].Grade", 4)?);
/// assert_eq!(predicate.comparisons().len(), 2);
/// # Ok::<(), docstore_core::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    comparisons: Vec<Comparison>,
}

impl Predicate {
    /// Predicate matching every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Predicate from a single comparison
    pub fn compare(path: &str, op: CompareOp, value: impl Into<Value>) -> Result<Self> {
        let path: FieldPath = path.parse()?;
        Ok(Self {
            comparisons: vec![Comparison::new(path, op, value)],
        })
    }

    /// `path = value`
    pub fn eq(path: &str, value: impl Into<Value>) -> Result<Self> {
        Self::compare(path, CompareOp::Eq, value)
    }

    /// `path != value`
    pub fn ne(path: &str, value: impl Into<Value>) -> Result<Self> {
        Self::compare(path, CompareOp::Ne, value)
    }

    /// `path < value`
    pub fn lt(path: &str, value: impl Into<Value>) -> Result<Self> {
        Self::compare(path, CompareOp::Lt, value)
    }

    /// `path <= value`
    pub fn le(path: &str, value: impl Into<Value>) -> Result<Self> {
        Self::compare(path, CompareOp::Le, value)
    }

    /// `path > value`
    pub fn gt(path: &str, value: impl Into<Value>) -> Result<Self> {
        Self::compare(path, CompareOp::Gt, value)
    }

    /// `path >= value`
    pub fn ge(path: &str, value: impl Into<Value>) -> Result<Self> {
        Self::compare(path, CompareOp::Ge, value)
    }

    /// Conjunction of `self` and `other`
    pub fn and(mut self, other: Predicate) -> Self {
        self.comparisons.extend(other.comparisons);
        self
    }

    /// Add one comparison
    pub fn push(&mut self, comparison: Comparison) {
        self.comparisons.push(comparison);
    }

    /// The comparisons, all of which must hold
    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    /// True if this predicate matches everything
    pub fn is_all(&self) -> bool {
        self.comparisons.is_empty()
    }

    /// Evaluate against a document
    pub fn matches(&self, doc: &Value) -> bool {
        self.comparisons.iter().all(|c| c.matches(doc))
    }

    /// Partition key fixed by equalities on every key path, if any
    ///
    /// When this returns `Some`, documents outside that logical partition
    /// cannot match, so a scan may be restricted to it.
    pub fn partition_key(&self, definition: &PartitionKeyDefinition) -> Option<PartitionKey> {
        let mut components = Vec::with_capacity(definition.paths().len());
        for path in definition.paths() {
            let component = self.comparisons.iter().find_map(|c| {
                if c.op == CompareOp::Eq && &c.path == path {
                    PartitionKeyComponent::from_json(&c.value)
                } else {
                    None
                }
            })?;
            components.push(component);
        }
        Some(PartitionKey::composite(components))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparisons.is_empty() {
            return f.write_str("true");
        }
        for (i, c) in self.comparisons.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{} {} {}", c.path, c.op, c.value)?;
        }
        Ok(())
    }
}
