//! Item API Integration Tests
//!
//! Point operations through the public client: ETag semantics, input
//! validation, and request charges.

#[path = "../common/mod.rs"]
mod common;
