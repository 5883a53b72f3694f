//! Cross-reference extraction
//!
//! Embedded references are found by matching the remote system's canonical
//! entity URL shape (`{base}/{type}/{id}/`) against the raw response text,
//! without any knowledge of the document schema.

use crate::entity::WorkItem;
use crate::{EntityError, EntityResult};
use regex::Regex;
use std::collections::HashSet;

const TYPE_PATTERN: &str = r"(?P<type>[A-Za-z][A-Za-z0-9_-]*)";
const ID_PATTERN: &str = r"(?P<id>[A-Za-z0-9_-]+)";

/// Finds entity references pointing at one base URL
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    embedded: Regex,
    exact: Regex,
}

impl LinkExtractor {
    /// Builds an extractor for entity URLs below `base_url`
    ///
    /// A trailing slash on the base URL is ignored.
    pub fn new(base_url: &str) -> Result<Self, regex::Error> {
        let base = regex::escape(base_url.trim_end_matches('/'));
        let body = format!("{}/{}/{}", base, TYPE_PATTERN, ID_PATTERN);

        Ok(Self {
            embedded: Regex::new(&body)?,
            exact: Regex::new(&format!(r"^{}/?$", body))?,
        })
    }

    /// Extracts every distinct entity referenced in `raw`
    ///
    /// Items are returned in order of first appearance.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_harvester::LinkExtractor;
    ///
    /// let links = LinkExtractor::new("https://example.org/api").unwrap();
    /// let found = links.extract(r#"{"archive": "https://example.org/api/archives/42/"}"#);
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].to_string(), "archives/42");
    /// ```
    pub fn extract(&self, raw: &str) -> Vec<WorkItem> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for caps in self.embedded.captures_iter(raw) {
            let (Some(entity_type), Some(entity_id)) = (caps.name("type"), caps.name("id")) else {
                continue;
            };
            match WorkItem::new(entity_type.as_str(), entity_id.as_str()) {
                Ok(item) => {
                    if seen.insert(item.clone()) {
                        items.push(item);
                    }
                }
                Err(e) => tracing::trace!("Ignoring reference: {}", e),
            }
        }

        items
    }

    /// Parses a URL that must be exactly one entity's canonical URL
    pub fn parse(&self, url: &str) -> EntityResult<WorkItem> {
        let caps = self
            .exact
            .captures(url.trim())
            .ok_or_else(|| EntityError::NotAnEntityUrl(url.to_string()))?;

        match (caps.name("type"), caps.name("id")) {
            (Some(entity_type), Some(entity_id)) => {
                WorkItem::new(entity_type.as_str(), entity_id.as_str())
            }
            _ => Err(EntityError::NotAnEntityUrl(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.org/api";

    #[test]
    fn test_extracts_embedded_references() {
        let links = LinkExtractor::new(BASE).unwrap();
        let raw = r#"{
            "url": "https://example.org/api/sources/117/",
            "archive": {"url": "https://example.org/api/archives/42/"},
            "people": ["https://example.org/api/people/7/", "https://example.org/api/people/8"]
        }"#;

        let found: Vec<String> = links.extract(raw).iter().map(|i| i.to_string()).collect();
        assert_eq!(
            found,
            vec!["sources/117", "archives/42", "people/7", "people/8"]
        );
    }

    #[test]
    fn test_deduplicates_preserving_first_order() {
        let links = LinkExtractor::new(BASE).unwrap();
        let raw = "https://example.org/api/archives/42/ https://example.org/api/cities/1/ https://example.org/api/archives/42/";

        let found = links.extract(raw);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].entity_type(), "archives");
        assert_eq!(found[1].entity_type(), "cities");
    }

    #[test]
    fn test_ignores_foreign_hosts_and_non_entity_paths() {
        let links = LinkExtractor::new(BASE).unwrap();
        let raw = r#"{
            "a": "https://other.org/api/archives/42/",
            "b": "https://example.org/api/search/?type=all",
            "c": "https://example.org/static/archives/1/"
        }"#;

        assert!(links.extract(raw).is_empty());
    }

    #[test]
    fn test_base_with_trailing_slash() {
        let links = LinkExtractor::new("http://127.0.0.1:8080/").unwrap();
        let found = links.extract(r#""http://127.0.0.1:8080/archives/3/""#);
        assert_eq!(found, vec![WorkItem::new("archives", "3").unwrap()]);
    }

    #[test]
    fn test_parse_exact_url() {
        let links = LinkExtractor::new(BASE).unwrap();

        let item = links.parse("https://example.org/api/sources/117/").unwrap();
        assert_eq!(item, WorkItem::new("sources", "117").unwrap());

        assert!(links.parse("https://example.org/api/sources/117").is_ok());
        assert!(links.parse("https://example.org/api/sources/").is_err());
        assert!(links.parse("https://example.org/api/sources/117/images/").is_err());
        assert!(links.parse("https://other.org/api/sources/117/").is_err());
    }
}
