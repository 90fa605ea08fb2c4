//! Partition keys and partition key definitions
//!
//! A container is bound to a [`PartitionKeyDefinition`]: one slash path
//! (`/LastName`) or, for hierarchical keys, up to three of them. Every
//! document's [`PartitionKey`] is the ordered list of values found at those
//! paths.
//!
//! # Canonical Encoding
//!
//! Keys have a canonical byte encoding (type tag + payload per component)
//! used for hashing into effective partition keys and for ordering.
//! Numbers are encoded as IEEE-754 bits with `-0.0` folded into `0.0`, so
//! `1`, `1.0` and `1e0` all land in the same partition.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};
use crate::limits::{MAX_PARTITION_KEY_PATHS, MAX_PARTITION_KEY_SIZE};
use crate::path::FieldPath;

const TAG_UNDEFINED: u8 = 0x00;
const TAG_NULL: u8 = 0x01;
const TAG_FALSE: u8 = 0x02;
const TAG_TRUE: u8 = 0x03;
const TAG_NUMBER: u8 = 0x05;
const TAG_STRING: u8 = 0x08;

/// One component of a partition key value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PartitionKeyComponent {
    /// The document has no value at the key path
    Undefined,
    /// JSON `null`
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number
    Number(f64),
    /// JSON string
    String(String),
}

impl PartitionKeyComponent {
    /// Convert a JSON scalar into a component
    ///
    /// Objects and arrays cannot be partition key values and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(PartitionKeyComponent::Null),
            Value::Bool(b) => Some(PartitionKeyComponent::Bool(*b)),
            Value::Number(n) => n.as_f64().map(PartitionKeyComponent::Number),
            Value::String(s) => Some(PartitionKeyComponent::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Convert back to JSON; `Undefined` has no JSON form
    pub fn to_json(&self) -> Option<Value> {
        match self {
            PartitionKeyComponent::Undefined => None,
            PartitionKeyComponent::Null => Some(Value::Null),
            PartitionKeyComponent::Bool(b) => Some(Value::Bool(*b)),
            PartitionKeyComponent::Number(n) => serde_json::Number::from_f64(*n).map(Value::Number),
            PartitionKeyComponent::String(s) => Some(Value::String(s.clone())),
        }
    }

    fn canonical_number(n: f64) -> f64 {
        if n == 0.0 {
            0.0
        } else {
            n
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            PartitionKeyComponent::Undefined => out.push(TAG_UNDEFINED),
            PartitionKeyComponent::Null => out.push(TAG_NULL),
            PartitionKeyComponent::Bool(false) => out.push(TAG_FALSE),
            PartitionKeyComponent::Bool(true) => out.push(TAG_TRUE),
            PartitionKeyComponent::Number(n) => {
                out.push(TAG_NUMBER);
                out.extend_from_slice(&Self::canonical_number(*n).to_bits().to_be_bytes());
            }
            PartitionKeyComponent::String(s) => {
                out.push(TAG_STRING);
                out.extend_from_slice(s.as_bytes());
                out.push(0x00);
            }
        }
    }
}

impl PartialEq for PartitionKeyComponent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PartitionKeyComponent::Undefined, PartitionKeyComponent::Undefined) => true,
            (PartitionKeyComponent::Null, PartitionKeyComponent::Null) => true,
            (PartitionKeyComponent::Bool(a), PartitionKeyComponent::Bool(b)) => a == b,
            (PartitionKeyComponent::Number(a), PartitionKeyComponent::Number(b)) => {
                Self::canonical_number(*a).to_bits() == Self::canonical_number(*b).to_bits()
            }
            (PartitionKeyComponent::String(a), PartitionKeyComponent::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PartitionKeyComponent {}

impl Hash for PartitionKeyComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf.hash(state);
    }
}

impl fmt::Display for PartitionKeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Some(json) => write!(f, "{}", json),
            None => write!(f, "{{}}"),
        }
    }
}

/// Partition key value of a document
///
/// Usually a single component; hierarchical containers produce one
/// component per configured path.
///
/// ```
/// use docstore_core::PartitionKey;
///
/// let pk = PartitionKey::from("Andersen");
/// assert_eq!(pk.to_string(), "[\"Andersen\"]");
/// assert_eq!(pk.effective_hash(), PartitionKey::from("Andersen").effective_hash());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    components: SmallVec<[PartitionKeyComponent; 1]>,
}

impl PartitionKey {
    /// Key for documents that have no value at the key path
    pub fn none() -> Self {
        PartitionKey {
            components: SmallVec::from_elem(PartitionKeyComponent::Undefined, 1),
        }
    }

    /// Build a hierarchical key from its components
    pub fn composite(components: impl IntoIterator<Item = PartitionKeyComponent>) -> Self {
        PartitionKey {
            components: components.into_iter().collect(),
        }
    }

    /// Build a key from a JSON scalar or an array of scalars (hierarchical)
    pub fn from_json(value: &Value) -> Result<Self> {
        let components: Option<SmallVec<[PartitionKeyComponent; 1]>> = match value {
            Value::Array(items) => items.iter().map(PartitionKeyComponent::from_json).collect(),
            scalar => PartitionKeyComponent::from_json(scalar).map(|c| SmallVec::from_elem(c, 1)),
        };
        match components {
            Some(components) if !components.is_empty() => Ok(PartitionKey { components }),
            _ => Err(Error::invalid_input(format!(
                "partition key must be a scalar or array of scalars: {}",
                value
            ))),
        }
    }

    /// Components in path order
    pub fn components(&self) -> &[PartitionKeyComponent] {
        &self.components
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True if the key has no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Canonical byte encoding
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        for component in &self.components {
            component.encode_into(&mut out);
        }
        out
    }

    /// 64-bit effective partition key (xxh3 of the canonical encoding)
    pub fn effective_hash(&self) -> u64 {
        xxh3_64(&self.encode())
    }

    /// Validate the encoded size against [`MAX_PARTITION_KEY_SIZE`]
    pub fn validate(&self) -> Result<()> {
        let size = self.encode().len();
        if size > MAX_PARTITION_KEY_SIZE {
            return Err(Error::invalid_input(format!(
                "partition key of {} bytes exceeds maximum of {} bytes",
                size, MAX_PARTITION_KEY_SIZE
            )));
        }
        Ok(())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", component)?;
        }
        write!(f, "]")
    }
}

impl From<PartitionKeyComponent> for PartitionKey {
    fn from(component: PartitionKeyComponent) -> Self {
        PartitionKey {
            components: SmallVec::from_elem(component, 1),
        }
    }
}

impl From<&str> for PartitionKey {
    fn from(s: &str) -> Self {
        PartitionKeyComponent::String(s.to_string()).into()
    }
}

impl From<String> for PartitionKey {
    fn from(s: String) -> Self {
        PartitionKeyComponent::String(s).into()
    }
}

impl From<f64> for PartitionKey {
    fn from(n: f64) -> Self {
        PartitionKeyComponent::Number(n).into()
    }
}

impl From<i64> for PartitionKey {
    fn from(n: i64) -> Self {
        PartitionKeyComponent::Number(n as f64).into()
    }
}

impl From<bool> for PartitionKey {
    fn from(b: bool) -> Self {
        PartitionKeyComponent::Bool(b).into()
    }
}

/// Partition key paths a container is bound to
///
/// Immutable once the container is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKeyDefinition {
    paths: Vec<FieldPath>,
}

impl PartitionKeyDefinition {
    /// Single-path definition, e.g. `/LastName`
    pub fn new(path: &str) -> Result<Self> {
        Self::hierarchical(&[path])
    }

    /// Hierarchical definition with one to three paths
    pub fn hierarchical<S: AsRef<str>>(paths: &[S]) -> Result<Self> {
        if paths.is_empty() || paths.len() > MAX_PARTITION_KEY_PATHS {
            return Err(Error::invalid_input(format!(
                "partition key definition needs 1 to {} paths, got {}",
                MAX_PARTITION_KEY_PATHS,
                paths.len()
            )));
        }
        let paths = paths
            .iter()
            .map(|p| FieldPath::parse_slash(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(PartitionKeyDefinition { paths })
    }

    /// Configured paths in order
    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    /// True when more than one path is configured
    pub fn is_hierarchical(&self) -> bool {
        self.paths.len() > 1
    }
}

impl fmt::Display for PartitionKeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.paths.iter().map(|p| p.to_slash_string()).collect();
        write!(f, "{}", rendered.join(","))
    }
}

impl std::str::FromStr for PartitionKeyDefinition {
    type Err = Error;

    /// Parse `/a` or a comma-separated hierarchical list `/a,/b`
    fn from_str(s: &str) -> Result<Self> {
        let paths: Vec<&str> = s.split(',').map(str::trim).collect();
        Self::hierarchical(&paths)
    }
}
