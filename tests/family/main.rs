//! Family Scenario Tests
//!
//! The Andersen/Wakefield walkthrough end to end: database and container
//! setup, throughput scaling, item lifecycle, query, and teardown.

#[path = "../common/mod.rs"]
mod common;

mod lifecycle;
