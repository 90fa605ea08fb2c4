//! Changing provisioned throughput

use crate::common::*;
use docstore::ContainerState;
use std::time::Duration;

#[test]
fn replace_throughput_adjusts_the_current_window() {
    let (client, _clock) = manual_client();
    let container = create_family_container(&client, 400);
    container
        .create_item(&member("a", "Andersen"), &PartitionKey::from("Andersen"))
        .unwrap();

    container.replace_throughput(1000).unwrap();
    assert_eq!(container.read_throughput().unwrap(), 1000);
    assert_eq!(container.governor().available(), 1000.0 - 6.0);
    assert_eq!(container.state(), ContainerState::Active);

    container.replace_throughput(400).unwrap();
    assert_eq!(container.governor().available(), 400.0);
}

#[test]
fn scale_down_after_heavy_use_resumes_after_one_window() {
    let (client, clock) = manual_client();
    let container = create_family_container(&client, 10_000);
    let pk = PartitionKey::from("Andersen");
    let mut i = 0;
    while container.governor().available() > 100.0 {
        container
            .create_item(&member(format!("m{}", i), "Andersen"), &pk)
            .unwrap();
        i += 1;
    }

    container.replace_throughput(400).unwrap();
    assert!(container.governor().available() <= 100.0);
    assert!(container.governor().available() > -400.0);

    clock.advance(Duration::from_secs(1));
    container
        .create_item(&member("after-scale-down", "Andersen"), &pk)
        .unwrap();
    assert_eq!(container.read_throughput().unwrap(), 400);
}

#[test]
fn invalid_throughput_leaves_container_active() {
    let (client, _clock) = manual_client();
    let container = create_family_container(&client, 400);
    for bad in [0, 300, 450, 1_000_100] {
        let err = container.replace_throughput(bad).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }), "{}", bad);
    }
    assert_eq!(container.read_throughput().unwrap(), 400);
    assert_eq!(container.state(), ContainerState::Active);
}

#[test]
fn physical_layout_is_fixed_at_creation() {
    let (client, _clock) = manual_client();
    let container = create_family_container(&client, 25_000);
    assert_eq!(container.properties().physical_partitions, 3);

    container.replace_throughput(400).unwrap();
    assert_eq!(container.properties().physical_partitions, 3);
}

#[test]
fn create_rejects_invalid_throughput() {
    let client = test_client();
    let database = client
        .create_database_if_not_exists(DATABASE_ID)
        .unwrap()
        .into_inner();
    let err = database
        .create_container_if_not_exists(CONTAINER_ID, "/LastName", 399)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));
    assert!(database.list_containers().unwrap().is_empty());
}

#[test]
fn deleted_container_rejects_throughput_changes() {
    let client = test_client();
    let container = create_family_container(&client, 400);
    client
        .database(DATABASE_ID)
        .unwrap()
        .delete_container(CONTAINER_ID)
        .unwrap();
    assert!(container.read_throughput().unwrap_err().is_not_found());
    assert!(container.replace_throughput(1000).unwrap_err().is_not_found());
}
