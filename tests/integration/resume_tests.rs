//! Checkpointed resume across runs

use crate::common::{create_test_config, entity_url, files_on_disk, listing_page, mount_entity};
use entity_harvester::config::Config;
use entity_harvester::crawler::{run_harvest, Coordinator};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(20);

async fn mount_listing(server: &MockServer, expected_pages: u64) {
    let urls = [
        entity_url(server, "sources", "117"),
        entity_url(server, "sources", "118"),
    ];
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(None, &urls)))
        .expect(expected_pages)
        .mount(server)
        .await;
}

fn listing_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = create_test_config(&server.uri(), dir.path());
    config.remote.listing_path = "search/".to_string();
    config
}

#[tokio::test]
async fn test_second_run_fetches_nothing_new() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 2).await;
    mount_entity(
        &server,
        "sources",
        "117",
        json!({"archive": entity_url(&server, "archives", "42")}),
        1,
    )
    .await;
    mount_entity(&server, "sources", "118", json!({"id": 118}), 1).await;
    mount_entity(&server, "archives", "42", json!({"id": 42}), 1).await;

    let first = tokio::time::timeout(TIMEOUT, run_harvest(listing_config(&server, &dir)))
        .await
        .unwrap()
        .unwrap();
    let files_after_first = files_on_disk(dir.path());
    let archive_after_first = std::fs::read(dir.path().join("archives/42.json")).unwrap();

    let second = tokio::time::timeout(TIMEOUT, run_harvest(listing_config(&server, &dir)))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.counts.fetched, 3);
    assert_eq!(second.counts.fetched, 0);
    assert_eq!(second.discovery.skipped_checkpoint, 2);
    assert_eq!(files_on_disk(dir.path()), files_after_first);
    assert_eq!(
        std::fs::read(dir.path().join("archives/42.json")).unwrap(),
        archive_after_first
    );
}

#[tokio::test]
async fn test_revisit_ignores_checkpoints() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 2).await;
    mount_entity(&server, "sources", "117", json!({"id": 117}), 2).await;
    mount_entity(&server, "sources", "118", json!({"id": 118}), 2).await;

    tokio::time::timeout(TIMEOUT, run_harvest(listing_config(&server, &dir)))
        .await
        .unwrap()
        .unwrap();

    let mut config = listing_config(&server, &dir);
    config.crawler.revisit = true;
    let second = tokio::time::timeout(TIMEOUT, run_harvest(config))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(second.counts.fetched, 2);
    assert_eq!(second.counts.checkpointed, 0);
    assert_eq!(
        files_on_disk(dir.path()),
        vec!["sources/117.json", "sources/118.json"]
    );
}

#[tokio::test]
async fn test_cancelled_run_reports_cancellation() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_entity(&server, "sources", "1", json!({"id": 1}), 0).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.seeds = vec![crate::common::seed("sources", "1")];

    let coordinator = Coordinator::new(config).unwrap();
    coordinator.shutdown_token().cancel();

    let summary = tokio::time::timeout(TIMEOUT, coordinator.run())
        .await
        .unwrap()
        .unwrap();

    assert!(summary.cancelled);
    assert!(files_on_disk(dir.path()).is_empty());
}

#[tokio::test]
async fn test_cancel_mid_run_writes_every_fetched_document() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for id in 1..=12 {
        Mock::given(method("GET"))
            .and(path(format!("/sources/{}/", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": id}))
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server.uri(), dir.path());
    config.crawler.writer_workers = 1;
    config.seeds = (1..=12)
        .map(|id| crate::common::seed("sources", &id.to_string()))
        .collect();

    let coordinator = Coordinator::new(config).unwrap();
    let shutdown = coordinator.shutdown_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        shutdown.cancel();
    });

    let summary = tokio::time::timeout(TIMEOUT, coordinator.run())
        .await
        .unwrap()
        .unwrap();

    // Four workers at 150ms per entity cannot finish twelve before the cancel
    assert!(summary.cancelled);
    assert!(summary.counts.fetched > 0);
    assert!(summary.counts.fetched < 12);
    assert_eq!(summary.counts.persisted, summary.counts.fetched);
    assert_eq!(files_on_disk(dir.path()).len() as u64, summary.counts.fetched);
}
