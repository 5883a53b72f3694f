//! Shared fixtures for the integration tests

use entity_harvester::config::{
    validate, Config, CrawlerConfig, EntitiesConfig, OutputConfig, RateConfig, RemoteConfig,
    SeedEntry,
};
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration with listing discovery disabled
pub fn create_test_config(base_url: &str, root: &Path) -> Config {
    let config = Config {
        remote: RemoteConfig {
            base_url: base_url.to_string(),
            listing_path: String::new(),
            user_agent: "entity-harvester-tests/1.0".to_string(),
            request_timeout_secs: 5,
        },
        output: OutputConfig {
            root: root.display().to_string(),
        },
        rate: RateConfig {
            global_per_second: 1000.0,
            listing_per_second: 1000.0,
            burst: 1,
            max_in_flight: None,
        },
        crawler: CrawlerConfig {
            fetch_workers: 4,
            writer_workers: 2,
            max_retries: 2,
            retry_backoff_ms: 1,
            frontier_capacity: 100,
            max_backlog: 50,
            revisit: false,
        },
        entities: EntitiesConfig::default(),
        seeds: vec![],
    };
    validate(&config).expect("test config should be valid");
    config
}

pub fn seed(entity_type: &str, id: &str) -> SeedEntry {
    SeedEntry {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
    }
}

/// Canonical URL of an entity on the mock server
pub fn entity_url(server: &MockServer, entity_type: &str, id: &str) -> String {
    format!("{}/{}/{}/", server.uri(), entity_type, id)
}

/// Serves `body` for one entity, expecting exactly `expected` requests
pub async fn mount_entity(
    server: &MockServer,
    entity_type: &str,
    id: &str,
    body: Value,
    expected: u64,
) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/{}/", entity_type, id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected)
        .mount(server)
        .await;
}

/// Builds one listing page body
pub fn listing_page(next: Option<String>, urls: &[String]) -> Value {
    json!({
        "pagination": {"next": next},
        "results": urls.iter().map(|url| json!({"url": url})).collect::<Vec<_>>()
    })
}

/// Relative paths of every persisted document below `root`, sorted
pub fn files_on_disk(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let Ok(types) = std::fs::read_dir(root) else {
        return files;
    };
    for entry in types.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        let entity_type = entry.file_name().to_string_lossy().into_owned();
        for file in std::fs::read_dir(entry.path()).unwrap().flatten() {
            files.push(format!(
                "{}/{}",
                entity_type,
                file.file_name().to_string_lossy()
            ));
        }
    }
    files.sort();
    files
}

/// Parses a persisted document
pub fn read_document(root: &Path, relative: &str) -> Value {
    let text = std::fs::read_to_string(root.join(relative)).unwrap();
    serde_json::from_str(&text).unwrap()
}
