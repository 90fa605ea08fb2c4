//! Paging and continuation

use crate::common::*;

#[test]
fn pages_respect_max_item_count_and_resume_in_order() {
    let (_client, container) = family_container(10_000);
    populate(&container, &["Andersen"], 5);

    let mut query = container
        .query_items(
            "SELECT * FROM f WHERE f.LastName = 'Andersen'",
            QueryOptions::new().with_max_item_count(2),
        )
        .unwrap();

    let mut ids = Vec::new();
    let mut sizes = Vec::new();
    while let Some(page) = query.next_page() {
        let page = page.unwrap();
        sizes.push(page.len());
        ids.extend(page.items.iter().map(|doc| doc["id"].as_str().unwrap().to_string()));
    }
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(
        ids,
        vec!["Andersen.0", "Andersen.1", "Andersen.2", "Andersen.3", "Andersen.4"]
    );
    let metrics = query.metrics();
    assert_eq!(metrics.pages, 3);
    assert_eq!(metrics.documents_returned, 5);
    assert_eq!(metrics.documents_examined, 5);
}

#[test]
fn exact_multiple_does_not_produce_trailing_empty_page() {
    let (_client, container) = family_container(10_000);
    populate(&container, &["Andersen"], 4);

    let query = container
        .query_items(
            "SELECT * FROM f",
            QueryOptions::new().with_max_item_count(2),
        )
        .unwrap();
    let pages: Vec<_> = query.map(|page| page.unwrap()).collect();
    assert_eq!(pages.len(), 2);
    assert!(pages[0].has_more_results);
    assert!(!pages[1].has_more_results);
}

#[test]
fn pages_span_partitions_without_duplicates() {
    let (_client, container) = family_container(10_000);
    populate(&container, &["Andersen", "Wakefield", "Smith"], 4);

    let query = container
        .query_items("SELECT * FROM f", QueryOptions::new().with_max_item_count(3))
        .unwrap();
    let mut seen = std::collections::HashSet::new();
    for page in query {
        let page = page.unwrap();
        assert!(page.len() <= 3);
        for doc in &page.items {
            let key = (
                doc["LastName"].as_str().unwrap().to_string(),
                doc["id"].as_str().unwrap().to_string(),
            );
            assert!(seen.insert(key), "duplicate {:?}", doc);
        }
    }
    assert_eq!(seen.len(), 12);
}

#[test]
fn empty_container_returns_one_empty_page() {
    let (_client, container) = family_container(400);
    let mut query = container
        .query_items("SELECT * FROM f", QueryOptions::new())
        .unwrap();
    assert!(query.has_more_results());
    let page = query.next_page().unwrap().unwrap();
    assert!(page.is_empty());
    assert!(!page.has_more_results);
    assert!(query.next_page().is_none());
}

#[test]
fn default_page_size_comes_from_client_config() {
    let client = DocumentClient::new(test_config().with_default_max_item_count(4)).unwrap();
    let container = create_family_container(&client, 10_000);
    populate(&container, &["Andersen"], 10);

    let mut query = container
        .query_items("SELECT * FROM f", QueryOptions::new())
        .unwrap();
    assert_eq!(query.next_page().unwrap().unwrap().len(), 4);
}

#[test]
fn documents_written_after_the_cursor_are_seen() {
    let (_client, container) = family_container(10_000);
    let pk = PartitionKey::from("Andersen");
    for id in ["a", "b", "c"] {
        container.create_item(&member(id, "Andersen"), &pk).unwrap();
    }

    let mut query = container
        .query_items("SELECT * FROM f", QueryOptions::new().with_max_item_count(2))
        .unwrap();
    let first = query.next_page().unwrap().unwrap();
    assert_eq!(first.len(), 2);

    container.create_item(&member("d", "Andersen"), &pk).unwrap();
    let rest = query.collect_items().unwrap();
    let ids: Vec<_> = rest.iter().map(|doc| doc["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["c", "d"]);
}

#[test]
fn typed_results() {
    let (_client, container) = family_container(10_000);
    for family in [andersen_family(), wakefield_family()] {
        container.create_item(&family, &family.partition_key()).unwrap();
    }
    let page = container
        .query_items(
            "SELECT * FROM f WHERE f.LastName = 'Wakefield'",
            QueryOptions::new(),
        )
        .unwrap()
        .next_page()
        .unwrap()
        .unwrap();
    let families: Vec<Family> = page.resources().unwrap();
    assert_eq!(families, vec![wakefield_family()]);
}

#[test]
fn query_page_charge() {
    let (_client, container) = family_container(10_000);
    populate(&container, &["Andersen"], 4);
    populate(&container, &["Wakefield"], 6);

    let page = container
        .query_items("SELECT * FROM f WHERE f.id = 'Andersen.2'", QueryOptions::new())
        .unwrap()
        .next_page()
        .unwrap()
        .unwrap();
    // 2.5 base + 10 examined * 0.05 + 1 returned * 0.5
    assert!((page.request_charge.units() - 3.5).abs() < 1e-9);
}
