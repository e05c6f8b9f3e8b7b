use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::path::Path;

use super::{CollectionInfo, DocumentStore, StoreError};
use crate::record::RawRecord;

/// Collections held in memory, listed in name order. Backs fixtures and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: BTreeMap<String, Vec<RawRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: &str, records: Vec<RawRecord>) -> Self {
        self.collections
            .entry(name.to_string())
            .or_default()
            .extend(records);
        self
    }

    pub fn insert(&mut self, collection: &str, record: RawRecord) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Parses `{"collection": [record, ...], ...}`.
    pub fn from_fixture_str(contents: &str) -> Result<Self, StoreError> {
        let collections: BTreeMap<String, Vec<RawRecord>> = serde_json::from_str(contents)?;
        Ok(Self { collections })
    }

    pub fn from_fixture_path(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Fixture {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_fixture_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            collections = store.collections.len(),
            records = store.record_count(),
            "loaded fixture store"
        );
        Ok(store)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        Ok(self
            .collections
            .keys()
            .map(|name| CollectionInfo::new(name.as_str()))
            .collect())
    }

    fn find<'a>(&'a self, collection: &'a str) -> BoxStream<'a, Result<RawRecord, StoreError>> {
        let records = self
            .collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or_default();
        stream::iter(records.iter().cloned().map(Ok)).boxed()
    }
}
