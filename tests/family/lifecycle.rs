//! Catalog lifecycle with family data

use crate::common::*;
use docstore::ContainerState;
use std::sync::Arc;

#[test]
fn delete_database_removes_both_containers_and_documents() {
    let client = test_client();
    let database = client
        .create_database_if_not_exists(DATABASE_ID)
        .unwrap()
        .into_inner();
    let families = database
        .create_container_if_not_exists("Families", "/LastName", 400)
        .unwrap()
        .into_inner();
    let archive = database
        .create_container_if_not_exists("Archive", "/LastName", 400)
        .unwrap()
        .into_inner();

    for container in [&families, &archive] {
        for family in [andersen_family(), wakefield_family()] {
            container.create_item(&family, &family.partition_key()).unwrap();
        }
    }
    assert_eq!(database.list_containers().unwrap().len(), 2);

    client.delete_database(DATABASE_ID).unwrap();

    for container in [&families, &archive] {
        assert_eq!(container.state(), ContainerState::Deleted);
        assert_eq!(container.document_count(), 0);
        assert_eq!(container.partition_count(), 0);
    }
    assert!(client.list_databases().is_empty());
    assert!(database.container("Families").unwrap_err().is_not_found());
}

#[test]
fn container_identity_is_stable_until_deleted() {
    let client = test_client();
    let first = create_family_container(&client, 400);
    let second = create_family_container(&client, 400);
    assert!(Arc::ptr_eq(&first, &second));

    let database = client.database(DATABASE_ID).unwrap();
    database.delete_container(CONTAINER_ID).unwrap();
    let third = create_family_container(&client, 400);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_ne!(first.resource_id(), third.resource_id());
}

#[test]
fn container_properties_describe_the_container() {
    let client = test_client();
    let container = create_family_container(&client, 400);
    let properties = container.properties();
    assert_eq!(properties.id, CONTAINER_ID);
    assert_eq!(properties.database, DATABASE_ID);
    assert_eq!(properties.partition_key.to_string(), "/LastName");
    assert_eq!(properties.physical_partitions, 1);

    let listed = client
        .database(DATABASE_ID)
        .unwrap()
        .list_containers()
        .unwrap();
    assert_eq!(listed, vec![properties.clone()]);
}
