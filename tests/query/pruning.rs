//! Partition pruning

use crate::common::*;
use docstore::Predicate;

fn populated(throughput: u32) -> (DocumentClient, std::sync::Arc<Container>) {
    let (client, container) = family_container(throughput);
    populate(&container, &["Andersen"], 5);
    populate(&container, &["Wakefield"], 7);
    populate(&container, &["Smith"], 3);
    (client, container)
}

#[test]
fn equality_on_partition_key_scans_one_partition() {
    let (_client, container) = populated(10_000);
    let mut query = container
        .query_items(
            "SELECT * FROM f WHERE f.LastName = 'Andersen'",
            QueryOptions::new(),
        )
        .unwrap();
    assert_eq!(query.partitions_in_scope(), 1);

    let page = query.next_page().unwrap().unwrap();
    assert_eq!(page.len(), 5);
    assert_eq!(page.documents_examined, 5);
    assert!(!page.has_more_results);
    assert!(query.next_page().is_none());
    assert_eq!(query.metrics().partitions_visited, 1);
}

#[test]
fn non_key_filter_scans_every_partition() {
    let (_client, container) = populated(10_000);
    let mut query = container
        .query_items("SELECT * FROM f WHERE f.id = 'Smith.1'", QueryOptions::new())
        .unwrap();
    assert_eq!(query.partitions_in_scope(), 3);

    let page = query.next_page().unwrap().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.items[0]["id"], json!("Smith.1"));
    assert_eq!(page.documents_examined, 15);
}

#[test]
fn explicit_partition_key_option_prunes() {
    let (_client, container) = populated(10_000);
    let items = container
        .query_items(
            "SELECT * FROM f",
            QueryOptions::new().with_partition_key("Wakefield"),
        )
        .unwrap()
        .collect_items()
        .unwrap();
    assert_eq!(items.len(), 7);
    assert!(items.iter().all(|doc| doc["LastName"] == json!("Wakefield")));
}

#[test]
fn unknown_partition_yields_single_empty_page() {
    let (_client, container) = populated(10_000);
    let mut query = container
        .query_items(
            Predicate::eq("LastName", "Nobody").unwrap(),
            QueryOptions::new(),
        )
        .unwrap();
    assert_eq!(query.partitions_in_scope(), 0);
    assert!(query.has_more_results());

    let page = query.next_page().unwrap().unwrap();
    assert!(page.is_empty());
    assert_eq!(page.documents_examined, 0);
    assert_eq!(page.request_charge.units(), 2.5);
    assert!(!query.has_more_results());
}

#[test]
fn hierarchical_key_pruning_requires_every_path() {
    let client = test_client();
    let container = client
        .create_database_if_not_exists(DATABASE_ID)
        .unwrap()
        .create_container_if_not_exists("ByAddress", "/Address/State,/Address/City", 10_000)
        .unwrap()
        .into_inner();
    for family in [andersen_family(), wakefield_family()] {
        let pk = PartitionKey::from_json(&json!([family.address.state, family.address.city]))
            .unwrap();
        container.create_item(&family, &pk).unwrap();
    }

    let both = container
        .query_items(
            "SELECT * FROM f WHERE f.Address.State = 'WA' AND f.Address.City = 'Seattle'",
            QueryOptions::new(),
        )
        .unwrap();
    assert_eq!(both.partitions_in_scope(), 1);

    let state_only = container
        .query_items("SELECT * FROM f WHERE f.Address.State = 'WA'", QueryOptions::new())
        .unwrap();
    assert_eq!(state_only.partitions_in_scope(), 2);
    let items = state_only.collect_items().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], json!("Andersen.1"));
}

#[test]
fn mismatched_type_comparisons_never_match() {
    let (_client, container) = family_container(10_000);
    for family in [andersen_family(), wakefield_family()] {
        container.create_item(&family, &family.partition_key()).unwrap();
    }

    let run = |text: &str| {
        container
            .query_items(text, QueryOptions::new())
            .unwrap()
            .collect_items()
            .unwrap()
            .len()
    };
    assert_eq!(run("SELECT * FROM f WHERE f.IsRegistered = true"), 1);
    assert_eq!(run("SELECT * FROM f WHERE f.IsRegistered = 'true'"), 0);
    assert_eq!(run("SELECT * FROM f WHERE f.IsRegistered != 'true'"), 0);
    assert_eq!(run("SELECT * FROM f WHERE f.Missing != 1"), 0);
    assert_eq!(run("SELECT * FROM f WHERE f.Children[0].Grade >= 5"), 2);
    assert_eq!(run("SELECT * FROM f WHERE f.Children[1].Grade < 5"), 1);
    assert_eq!(run("SELECT * FROM f WHERE f['Address'].City = 'NY'"), 1);
}
