//! Document validation helpers
//!
//! Documents are plain JSON objects. The only reserved field is `id`, a
//! non-empty string unique within its logical partition; the partition key
//! path is configured per container and checked by the router.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::limits::{MAX_DOCUMENT_SIZE, MAX_ID_LENGTH, MAX_RESOURCE_ID_LENGTH};

/// Reserved document id field
pub const ID_FIELD: &str = "id";

const FORBIDDEN_ID_CHARS: [char; 4] = ['/', '\\', '?', '#'];

/// Validate a document id or resource name
fn validate_name(kind: &str, id: &str, max_len: usize) -> Result<()> {
    if id.is_empty() {
        return Err(Error::invalid_input(format!("{} must not be empty", kind)));
    }
    if id.len() > max_len {
        return Err(Error::invalid_input(format!(
            "{} of {} bytes exceeds maximum of {} bytes",
            kind,
            id.len(),
            max_len
        )));
    }
    if let Some(c) = id.chars().find(|c| FORBIDDEN_ID_CHARS.contains(c)) {
        return Err(Error::invalid_input(format!(
            "{} '{}' contains forbidden character '{}'",
            kind, id, c
        )));
    }
    Ok(())
}

/// Validate a document id
pub fn validate_id(id: &str) -> Result<()> {
    validate_name("document id", id, MAX_ID_LENGTH)
}

/// Validate a database or container id
pub fn validate_resource_id(id: &str) -> Result<()> {
    validate_name("resource id", id, MAX_RESOURCE_ID_LENGTH)
}

/// Extract and validate the `id` of a document body
pub fn document_id(doc: &Value) -> Result<&str> {
    let obj = doc
        .as_object()
        .ok_or_else(|| Error::invalid_input("document must be a JSON object"))?;
    let id = match obj.get(ID_FIELD) {
        Some(Value::String(id)) => id.as_str(),
        Some(other) => {
            return Err(Error::invalid_input(format!(
                "document id must be a string, got {}",
                other
            )))
        }
        None => return Err(Error::invalid_input("document is missing the 'id' field")),
    };
    validate_id(id)?;
    Ok(id)
}

/// Compact JSON size of a value in bytes, without allocating the output
pub fn serialized_size(doc: &Value) -> usize {
    let mut counter = ByteCounter(0);
    // Writing into a counter cannot fail for a `Value`
    let _ = serde_json::to_writer(&mut counter, doc);
    counter.0
}

struct ByteCounter(usize);

impl std::io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Serialized size of a document, rejecting documents over [`MAX_DOCUMENT_SIZE`]
pub fn validate_size(doc: &Value) -> Result<usize> {
    let size = serialized_size(doc);
    if size > MAX_DOCUMENT_SIZE {
        return Err(Error::RequestTooLarge {
            size,
            max: MAX_DOCUMENT_SIZE,
        });
    }
    Ok(size)
}
