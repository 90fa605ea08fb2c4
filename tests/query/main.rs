//! Query Integration Tests
//!
//! Filtered queries through the public client: partition pruning, paging,
//! parameter binding and parse errors.

#[path = "../common/mod.rs"]
mod common;

mod paging;
mod pruning;
