//! Admission and throttling

use crate::common::*;
use std::time::Duration;

/// Creates that fit in a 400 RU window at 6 RU each, plus the one that
/// drives the balance negative
const ADMITTED_CREATES: usize = 67;

fn exhaust(container: &Container) {
    let pk = PartitionKey::from("Andersen");
    for i in 0..ADMITTED_CREATES {
        container
            .create_item(&member(format!("m{}", i), "Andersen"), &pk)
            .unwrap();
    }
}

#[test]
fn throttles_once_the_window_is_spent() {
    let (client, _clock) = manual_client();
    let container = create_family_container(&client, 400);
    exhaust(&container);
    assert!(container.governor().available() < 0.0);

    let err = container
        .create_item(&member("late", "Andersen"), &PartitionKey::from("Andersen"))
        .unwrap_err();
    assert_eq!(err.status_code(), 429);
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(1)));

    // A throttled create leaves no trace
    assert_eq!(container.document_count(), ADMITTED_CREATES);
}

#[test]
fn resumes_after_the_window_rolls() {
    let (client, clock) = manual_client();
    let container = create_family_container(&client, 400);
    exhaust(&container);
    let pk = PartitionKey::from("Andersen");

    clock.advance(Duration::from_millis(999));
    assert!(container.create_item(&member("late", "Andersen"), &pk).is_err());

    clock.advance(Duration::from_millis(1));
    container.create_item(&member("late", "Andersen"), &pk).unwrap();
    assert_eq!(container.governor().available(), 400.0 - 2.0 - 6.0);
}

#[test]
fn idle_windows_do_not_accumulate() {
    let (client, clock) = manual_client();
    let container = create_family_container(&client, 400);
    clock.advance(Duration::from_secs(60));
    assert_eq!(container.governor().available(), 400.0);
}

#[test]
fn retry_helper_eventually_succeeds() {
    let (client, clock) = manual_client();
    let container = create_family_container(&client, 400);
    exhaust(&container);
    let pk = PartitionKey::from("Andersen");
    let response = retry_throttled(&clock, || {
        container.create_item(&member("patient", "Andersen"), &pk)
    })
    .unwrap();
    assert_eq!(response.request_charge.units(), 6.0);
    assert_eq!(container.governor().stats().throttled, 1);
}

#[test]
fn failed_mutations_are_charged_and_validation_is_free() {
    let (client, _clock) = manual_client();
    let container = create_family_container(&client, 400);
    let pk = PartitionKey::from("Andersen");
    container.create_item(&member("a", "Andersen"), &pk).unwrap();

    let conflict = container.create_item(&member("a", "Andersen"), &pk).unwrap_err();
    assert_eq!(conflict.status_code(), 409);
    assert_eq!(container.governor().available(), 400.0 - 12.0);

    let mismatch = container
        .create_item(&member("b", "Wakefield"), &pk)
        .unwrap_err();
    assert!(matches!(mismatch, Error::PartitionKeyMismatch { .. }));
    assert_eq!(container.governor().available(), 400.0 - 12.0);
}

#[test]
fn read_misses_cost_one_unit() {
    let (client, _clock) = manual_client();
    let container = create_family_container(&client, 400);
    let err = container
        .read_item("ghost", &PartitionKey::from("Andersen"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(container.governor().available(), 399.0);
}

#[test]
fn reads_are_throttled_too() {
    let (client, _clock) = manual_client();
    let container = create_family_container(&client, 400);
    exhaust(&container);
    let err = container
        .read_item("m0", &PartitionKey::from("Andersen"))
        .unwrap_err();
    assert!(matches!(err, Error::Throttled { .. }));
}

#[test]
fn throttled_query_page_is_retried_from_the_same_position() {
    let (client, clock) = manual_client();
    let container = create_family_container(&client, 400);
    populate(&container, &["Andersen"], 4);

    let mut query = container
        .query_items("SELECT * FROM f", QueryOptions::new().with_max_item_count(2))
        .unwrap();
    let first = query.next_page().unwrap().unwrap();

    // Spend whatever budget is left
    let pk = PartitionKey::from("Andersen");
    let mut i = 0;
    while container.governor().available() > 0.0 {
        container
            .create_item(&member(format!("z{}", i), "Andersen"), &pk)
            .unwrap();
        i += 1;
    }
    assert!(matches!(
        query.next_page(),
        Some(Err(Error::Throttled { .. }))
    ));
    assert_eq!(query.metrics().pages, 1);

    clock.advance(Duration::from_secs(1));
    let second = query.next_page().unwrap().unwrap();
    assert_eq!(second.len(), 2);
    assert_ne!(first.items[0]["id"], second.items[0]["id"]);
    assert_eq!(second.items[0]["id"], json!("Andersen.2"));
}

#[test]
fn containers_have_independent_budgets() {
    let (client, _clock) = manual_client();
    let busy = create_family_container(&client, 400);
    let quiet = client
        .database(DATABASE_ID)
        .unwrap()
        .create_container_if_not_exists("Quiet", "/LastName", 400)
        .unwrap()
        .into_inner();
    exhaust(&busy);

    quiet
        .create_item(&member("a", "Andersen"), &PartitionKey::from("Andersen"))
        .unwrap();
    assert_eq!(quiet.governor().available(), 394.0);
}
