//! File-per-entity store
//!
//! The store is also the checkpoint record: a document is first written to a
//! `.part` sibling and then renamed into place, so a file at the final path
//! always holds a complete document.

use crate::entity::WorkItem;
use crate::storage::StorageResult;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTENSION: &str = "json";
const PARTIAL_SUFFIX: &str = ".part";

/// Entity documents on disk, partitioned by entity type
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`; nothing is touched on disk until the first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of the document for `item`
    pub fn path_for(&self, item: &WorkItem) -> PathBuf {
        self.root.join(item.relative_path())
    }

    /// Returns true if `item` was persisted by this or a previous run
    ///
    /// Errors while probing are treated as absence, which at worst costs a
    /// redundant fetch.
    pub async fn exists(&self, item: &WorkItem) -> bool {
        match tokio::fs::try_exists(self.path_for(item)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Could not check checkpoint for {}: {}", item, e);
                false
            }
        }
    }

    /// Writes `payload` as pretty-printed JSON and returns the final path
    ///
    /// Numbers keep the exact text they were parsed from, so large integers
    /// and long decimals survive the round trip. The type directory is
    /// created if missing. Rewriting an existing entity replaces the previous
    /// document.
    pub async fn write(&self, item: &WorkItem, payload: &Value) -> StorageResult<PathBuf> {
        let path = self.path_for(item);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = serde_json::to_vec_pretty(payload)?;
        body.push(b'\n');

        let mut partial = path.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        if let Err(e) = tokio::fs::write(&partial, &body).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        tokio::fs::rename(&partial, &path).await?;

        Ok(path)
    }

    /// Counts persisted documents per entity type
    ///
    /// Leftover `.part` files from an interrupted write are not counted. A
    /// missing root yields an empty inventory.
    pub fn inventory(&self) -> StorageResult<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();

        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(counts),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let entity_type = entry.file_name().to_string_lossy().into_owned();

            let mut documents = 0;
            for file in std::fs::read_dir(entry.path())? {
                let path = file?.path();
                if path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION) {
                    documents += 1;
                }
            }
            if documents > 0 {
                counts.insert(entity_type, documents);
            }
        }

        Ok(counts)
    }
}
