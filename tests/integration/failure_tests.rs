//! Retry bounds, terminal failures and discovery failures

use crate::common::{
    create_test_config, entity_url, files_on_disk, listing_page, mount_entity, seed,
};
use entity_harvester::crawler::run_harvest;
use entity_harvester::HarvestError;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(20);

#[tokio::test]
async fn test_success_after_max_retries_transient_failures() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // create_test_config allows two retries
    Mock::given(method("GET"))
        .and(path("/sources/1/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_entity(&server, "sources", "1", json!({"id": 1}), 1).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.seeds = vec![seed("sources", "1")];

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(files_on_disk(dir.path()), vec!["sources/1.json"]);
    assert_eq!(summary.counts.fetched, 1);
    assert_eq!(summary.counts.persisted, 1);
    assert_eq!(summary.counts.dropped(), 0);
}

#[tokio::test]
async fn test_dropped_after_max_retries_plus_one_failures() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sources/1/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.seeds = vec![seed("sources", "1")];

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert!(files_on_disk(dir.path()).is_empty());
    assert_eq!(summary.counts.exhausted, 1);
    assert_eq!(summary.counts.rejected, 0);
}

#[tokio::test]
async fn test_terminal_failures_are_not_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/sources/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>Login</html>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sources/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"id\": 2", "application/json"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sources/3/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.seeds = vec![seed("sources", "1"), seed("sources", "2"), seed("sources", "3")];

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert!(files_on_disk(dir.path()).is_empty());
    assert_eq!(summary.counts.rejected, 3);
    assert_eq!(summary.counts.exhausted, 0);
}

#[tokio::test]
async fn test_malformed_first_listing_page_aborts() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.remote.listing_path = "search/".to_string();

    let result = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap();

    match result {
        Err(HarvestError::DiscoverySeed { url, .. }) => assert!(url.ends_with("/search/")),
        other => panic!("expected a discovery seed error, got {:?}", other.map(|s| s.counts)),
    }
}

#[tokio::test]
async fn test_malformed_later_listing_page_keeps_harvested_work() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            Some("/search/?page=2".to_string()),
            &[entity_url(&server, "sources", "1")],
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_entity(&server, "sources", "1", json!({"id": 1}), 1).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.remote.listing_path = "search/".to_string();

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(files_on_disk(dir.path()), vec!["sources/1.json"]);
    assert_eq!(summary.discovery.pages, 1);
    assert!(summary.discovery.truncated);
}
