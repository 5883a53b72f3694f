//! Entity identifiers and classification
//!
//! This module provides the work item type that identifies one remote entity,
//! the fetch result handed from fetch workers to writers, entity type
//! classification, and cross-reference extraction.

mod links;

use crate::config::EntitiesConfig;
use crate::{EntityError, EntityResult};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

pub use links::LinkExtractor;

/// One remote resource, identified by entity type and id
///
/// Equality is structural and is the dedup key used across the harvest.
/// Both segments are validated on construction so a work item always maps
/// to a path inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkItem {
    entity_type: String,
    entity_id: String,
}

impl WorkItem {
    /// Creates a work item after validating both segments
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_harvester::WorkItem;
    ///
    /// let item = WorkItem::new("sources", "117").unwrap();
    /// assert_eq!(item.to_string(), "sources/117");
    /// assert!(WorkItem::new("sources", "../117").is_err());
    /// ```
    pub fn new(entity_type: &str, entity_id: &str) -> EntityResult<Self> {
        if !is_valid_entity_type(entity_type) {
            return Err(EntityError::InvalidType(entity_type.to_string()));
        }
        if !is_valid_entity_id(entity_id) {
            return Err(EntityError::InvalidId(entity_id.to_string()));
        }
        Ok(Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
        })
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Path of the persisted document relative to the output root
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.entity_type).join(format!("{}.json", self.entity_id))
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// A successfully fetched and parsed entity
///
/// Produced by a fetch worker and moved into the write queue; the writer
/// that dequeues it becomes its sole owner.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub item: WorkItem,
    pub payload: Value,
    pub raw_text: String,
}

impl FetchResult {
    /// Size of the response body as received
    pub fn body_len(&self) -> usize {
        self.raw_text.len()
    }
}

/// How the harvester treats a given entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityClass {
    /// Never followed, never fetched
    Excluded,
    /// Fetched to discover further links, never persisted
    FollowOnly,
    /// Fetched, followed and persisted
    Persist,
}

impl EntityClass {
    /// Returns true if references of this type should be queued
    pub fn should_follow(&self) -> bool {
        !matches!(self, Self::Excluded)
    }

    /// Returns true if fetched documents of this type are written to disk
    pub fn should_persist(&self) -> bool {
        matches!(self, Self::Persist)
    }
}

/// Classifies an entity type according to the configuration
///
/// The exclusion list takes priority over the follow-only list; any type
/// appearing in neither is persisted.
pub fn classify_entity(entity_type: &str, config: &EntitiesConfig) -> EntityClass {
    if config.excluded.iter().any(|t| t == entity_type) {
        return EntityClass::Excluded;
    }

    if config.follow_only.iter().any(|t| t == entity_type) {
        return EntityClass::FollowOnly;
    }

    EntityClass::Persist
}

/// Entity types start with a letter and continue with `[A-Za-z0-9_-]`
pub fn is_valid_entity_type(entity_type: &str) -> bool {
    let mut chars = entity_type.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(is_segment_char),
        _ => false,
    }
}

/// Entity ids are non-empty runs of `[A-Za-z0-9_-]`
pub fn is_valid_entity_id(entity_id: &str) -> bool {
    !entity_id.is_empty() && entity_id.chars().all(is_segment_char)
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
