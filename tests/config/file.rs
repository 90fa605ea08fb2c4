//! Loading client config from disk

use crate::common::*;
use docstore::config::CONFIG_FILE_NAME;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn client_from_default_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    ClientConfig::write_default_if_missing(&path).unwrap();

    let client = DocumentClient::from_config_file(&path).unwrap();
    assert_eq!(client.config().endpoint, "https://localhost:8081");
    assert_eq!(client.config().default_max_item_count, 100);

    let container = create_family_container(&client, 400);
    assert_eq!(container.governor().window(), Duration::from_secs(1));
}

#[test]
fn settings_from_file_reach_containers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    test_config()
        .with_default_max_item_count(3)
        .with_throughput_window(Duration::from_millis(250))
        .write_to_file(&path)
        .unwrap();

    let client = DocumentClient::from_config_file(&path).unwrap();
    assert_eq!(client.config().application_name.as_deref(), Some("docstore-tests"));

    let container = create_family_container(&client, 400);
    assert_eq!(container.governor().window(), Duration::from_millis(250));
    assert_eq!(container.governor().available(), 100.0);

    populate(&container, &["Andersen"], 5);
    let mut query = container
        .query_items("SELECT * FROM f", QueryOptions::new())
        .unwrap();
    assert_eq!(query.next_page().unwrap().unwrap().len(), 3);
}

#[test]
fn existing_file_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "endpoint = \"http://127.0.0.1:9000\"\nprimary_key = \"k\"\n",
    )
    .unwrap();
    ClientConfig::write_default_if_missing(&path).unwrap();

    let client = DocumentClient::from_config_file(&path).unwrap();
    assert_eq!(client.config().endpoint, "http://127.0.0.1:9000");
    assert_eq!(client.config().throughput_window_ms, 1000);
}

#[test]
fn invalid_files_are_config_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    let missing = DocumentClient::from_config_file(&path).unwrap_err();
    assert!(matches!(missing, Error::Config { .. }));

    std::fs::write(&path, "endpoint = \"ftp://nowhere\"\nprimary_key = \"k\"\n").unwrap();
    let err = DocumentClient::from_config_file(&path).unwrap_err();
    match err {
        Error::Config { reason } => {
            assert!(reason.contains("http"), "{}", reason);
            assert!(reason.contains(CONFIG_FILE_NAME), "{}", reason);
        }
        other => panic!("expected Config error, got {:?}", other),
    }

    std::fs::write(&path, "endpoint = [not toml").unwrap();
    assert!(matches!(
        DocumentClient::from_config_file(&path).unwrap_err(),
        Error::Config { .. }
    ));
}
