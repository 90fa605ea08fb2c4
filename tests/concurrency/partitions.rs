//! Writers spread across partitions, and catalog races

use crate::common::*;
use docstore::CreateStatus;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn writers_in_distinct_partitions_all_succeed() {
    let (_client, container) = family_container(100_000);
    let families: Vec<String> = (0..8).map(|i| format!("Family{}", i)).collect();

    let handles: Vec<_> = families
        .iter()
        .cloned()
        .map(|family| {
            let container = Arc::clone(&container);
            thread::spawn(move || {
                let pk = PartitionKey::from(family.as_str());
                for i in 0..25 {
                    container
                        .create_item(&member(format!("{}.{}", family, i), &family), &pk)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(container.partition_count(), 8);
    assert_eq!(container.document_count(), 200);
    for family in &families {
        let items = container
            .query_items(
                "SELECT * FROM f",
                QueryOptions::new().with_partition_key(family.as_str()),
            )
            .unwrap()
            .collect_items()
            .unwrap();
        assert_eq!(items.len(), 25);
    }
}

#[test]
fn racing_container_creates_share_one_instance() {
    let client = Arc::new(test_client());
    client.create_database_if_not_exists(DATABASE_ID).unwrap();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let response = client
                    .database(DATABASE_ID)
                    .unwrap()
                    .create_container_if_not_exists(CONTAINER_ID, "/LastName", 400)
                    .unwrap();
                (response.status, response.into_inner())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created = results
        .iter()
        .filter(|(status, _)| *status == CreateStatus::Created)
        .count();
    assert_eq!(created, 1);
    let first = &results[0].1;
    assert!(results.iter().all(|(_, c)| Arc::ptr_eq(c, first)));
}

#[test]
fn queries_run_while_writers_insert() {
    let (_client, container) = family_container(1_000_000);
    populate(&container, &["Andersen"], 50);

    let writer = {
        let container = Arc::clone(&container);
        thread::spawn(move || {
            let pk = PartitionKey::from("Wakefield");
            for i in 0..100 {
                container
                    .create_item(&member(format!("Wakefield.{}", i), "Wakefield"), &pk)
                    .unwrap();
            }
        })
    };

    for _ in 0..10 {
        let items = container
            .query_items(
                "SELECT * FROM f WHERE f.LastName = 'Andersen'",
                QueryOptions::new().with_max_item_count(7),
            )
            .unwrap()
            .collect_items()
            .unwrap();
        assert_eq!(items.len(), 50);
    }
    writer.join().unwrap();
    assert_eq!(container.document_count(), 150);
}

#[test]
fn deleting_a_container_under_write_load_leaves_it_empty() {
    let (client, container) = family_container(1_000_000);
    let barrier = Arc::new(Barrier::new(5));

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0.. {
                    let family = format!("Writer{}.{}", w, i);
                    let pk = PartitionKey::from(family.as_str());
                    match container.create_item(&member("m", &family), &pk) {
                        Ok(_) | Err(Error::Throttled { .. }) => {}
                        Err(err) => {
                            assert!(err.is_not_found(), "{:?}", err);
                            return;
                        }
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    thread::sleep(std::time::Duration::from_millis(5));
    client
        .database(DATABASE_ID)
        .unwrap()
        .delete_container(CONTAINER_ID)
        .unwrap();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(container.document_count(), 0);
    assert_eq!(container.partition_count(), 0);
}
