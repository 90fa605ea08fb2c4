//! Stress Tests
//!
//! Heavy workloads, all marked #[ignore] for opt-in execution.
//! Run with: cargo test --test concurrency stress -- --ignored

use crate::common::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Random mix of creates, reads, replaces and deletes over a small id space
#[test]
#[ignore]
fn stress_mixed_item_operations() {
    let (_client, container) = family_container(1_000_000);
    let families = ["Andersen", "Wakefield", "Smith", "Jones"];
    let barrier = Arc::new(Barrier::new(16));
    let operations = Arc::new(AtomicU64::new(0));
    let conflicts = Arc::new(AtomicU64::new(0));

    let start = Instant::now();
    let handles: Vec<_> = (0..16u64)
        .map(|thread_id| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            let operations = Arc::clone(&operations);
            let conflicts = Arc::clone(&conflicts);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(0xD0C5_7042 ^ thread_id);
                barrier.wait();
                for _ in 0..2_000 {
                    let family = families[rng.gen_range(0..families.len())];
                    let pk = PartitionKey::from(family);
                    let id = format!("{}.{}", family, rng.gen_range(0..64));
                    let result = match rng.gen_range(0..4) {
                        0 => container.create_item(&member(id.clone(), family), &pk).map(|_| ()),
                        1 => container.read_item(&id, &pk).map(|_| ()),
                        2 => container.upsert_item(&member(id.clone(), family), &pk).map(|_| ()),
                        _ => container.delete_item(&id, &pk, None).map(|_| ()),
                    };
                    match result {
                        Ok(()) => {}
                        Err(Error::Conflict { .. }) | Err(Error::NotFound { .. }) => {
                            conflicts.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(Error::Throttled { retry_after }) => thread::sleep(retry_after),
                        Err(e) => panic!("unexpected error: {:?}", e),
                    }
                    operations.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let elapsed = start.elapsed();
    let total = operations.load(Ordering::Relaxed);
    println!(
        "{} operations in {:?} ({:.0} ops/s), {} conflicts or misses",
        total,
        elapsed,
        total as f64 / elapsed.as_secs_f64(),
        conflicts.load(Ordering::Relaxed)
    );
    assert_eq!(total, 16 * 2_000);
    assert!(container.document_count() <= families.len() * 64);
}

/// Throttled clients backing off on the system clock never over-admit
#[test]
#[ignore]
fn stress_throttled_writers_respect_budget() {
    let (_client, container) = family_container(400);
    let deadline = Instant::now() + Duration::from_secs(3);
    let handles: Vec<_> = (0..8)
        .map(|thread_id| {
            let container = Arc::clone(&container);
            thread::spawn(move || {
                let pk = PartitionKey::from("Andersen");
                let mut i = 0;
                while Instant::now() < deadline {
                    let doc = member(format!("t{}.{}", thread_id, i), "Andersen");
                    match container.create_item(&doc, &pk) {
                        Ok(_) => i += 1,
                        Err(Error::Throttled { retry_after }) => thread::sleep(retry_after),
                        Err(e) => panic!("unexpected error: {:?}", e),
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = container.governor().stats();
    assert!(stats.throttled > 0);
    // At most four windows of budget, each overrun by at most one request
    assert!(container.document_count() <= 4 * (400 / 6 + 1));
}
