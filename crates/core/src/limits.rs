//! Size limits for documents and keys
//!
//! Violations are reported as `InvalidInput` or `RequestTooLarge` errors.

/// Maximum serialized document size in bytes (2 MiB)
pub const MAX_DOCUMENT_SIZE: usize = 2 * 1024 * 1024;

/// Maximum document id length in bytes
pub const MAX_ID_LENGTH: usize = 1023;

/// Maximum encoded partition key size in bytes
pub const MAX_PARTITION_KEY_SIZE: usize = 2048;

/// Maximum number of paths in a hierarchical partition key
pub const MAX_PARTITION_KEY_PATHS: usize = 3;

/// Maximum database or container id length in bytes
pub const MAX_RESOURCE_ID_LENGTH: usize = 255;
