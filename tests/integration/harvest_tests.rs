//! End-to-end harvests: link following, listing discovery, entity classes

use crate::common::{
    create_test_config, entity_url, files_on_disk, listing_page, mount_entity, read_document, seed,
};
use entity_harvester::crawler::run_harvest;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(20);

#[tokio::test]
async fn test_seed_follows_references_but_not_excluded_types() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_entity(
        &server,
        "sources",
        "117",
        json!({
            "id": 117,
            "title": "Parish register",
            "archive": {"url": entity_url(&server, "archives", "42")},
            "created_by": entity_url(&server, "users", "9")
        }),
        1,
    )
    .await;
    mount_entity(&server, "archives", "42", json!({"id": 42, "name": "Archivo"}), 1).await;
    mount_entity(&server, "users", "9", json!({"id": 9}), 0).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.entities.excluded = vec!["users".to_string()];
    config.seeds = vec![seed("sources", "117")];

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        files_on_disk(dir.path()),
        vec!["archives/42.json", "sources/117.json"]
    );
    assert_eq!(read_document(dir.path(), "archives/42.json")["name"], "Archivo");
    assert_eq!(summary.counts.persisted, 2);
    assert_eq!(summary.counts.excluded_links, 1);
    assert!(!summary.cancelled);
}

#[tokio::test]
async fn test_listing_pages_are_followed_to_the_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            None,
            &[entity_url(&server, "people", "3")],
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            Some("?type=all&page=2".to_string()),
            &[
                entity_url(&server, "sources", "1"),
                entity_url(&server, "sources", "2"),
            ],
        )))
        .expect(1)
        .mount(&server)
        .await;

    mount_entity(&server, "sources", "1", json!({"id": 1}), 1).await;
    mount_entity(&server, "sources", "2", json!({"id": 2}), 1).await;
    mount_entity(&server, "people", "3", json!({"id": 3}), 1).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.remote.listing_path = "search/?type=all".to_string();

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        files_on_disk(dir.path()),
        vec!["people/3.json", "sources/1.json", "sources/2.json"]
    );
    assert_eq!(summary.discovery.pages, 2);
    assert_eq!(summary.discovery.accepted, 3);
}

#[tokio::test]
async fn test_follow_only_types_are_crawled_but_not_written() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_entity(
        &server,
        "sources",
        "1",
        json!({"place": entity_url(&server, "cities", "5")}),
        1,
    )
    .await;
    mount_entity(
        &server,
        "cities",
        "5",
        json!({"notable": [entity_url(&server, "people", "8")]}),
        1,
    )
    .await;
    mount_entity(&server, "people", "8", json!({"id": 8}), 1).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.entities.follow_only = vec!["cities".to_string()];
    config.seeds = vec![seed("sources", "1")];

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        files_on_disk(dir.path()),
        vec!["people/8.json", "sources/1.json"]
    );
    assert_eq!(summary.counts.fetched, 3);
    assert_eq!(summary.counts.followed_only, 1);
}

#[tokio::test]
async fn test_shared_references_are_fetched_at_most_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let shared = entity_url(&server, "archives", "42");
    let sources: Vec<_> = (1..=6)
        .map(|i| entity_url(&server, "sources", &i.to_string()))
        .collect();

    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(None, &sources)))
        .expect(1)
        .mount(&server)
        .await;

    for i in 1..=6 {
        // Every source references the shared archive and its neighbours
        let body = json!({
            "archive": shared,
            "see_also": sources,
        });
        mount_entity(&server, "sources", &i.to_string(), body, 1).await;
    }
    mount_entity(&server, "archives", "42", json!({"id": 42}), 1).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.remote.listing_path = "search/".to_string();
    config.crawler.fetch_workers = 6;

    let summary = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(files_on_disk(dir.path()).len(), 7);
    assert_eq!(summary.counts.fetched, 7);
    assert_eq!(summary.counts.persisted, 7);
    // Wiremock verifies the one-request-per-entity expectations on drop
}
