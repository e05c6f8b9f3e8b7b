pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::record::RawRecord;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("collection {collection} returned an invalid record: {reason}")]
    InvalidRecord { collection: String, reason: String },
    #[error("failed to read fixture {}: {source}", .path.display())]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture: {0}")]
    FixtureFormat(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Read-only access to the document store holding the stage collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, StoreError>;

    /// Full, unfiltered scan of one collection. An unknown collection yields no records.
    fn find<'a>(&'a self, collection: &'a str) -> BoxStream<'a, Result<RawRecord, StoreError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "fixture" => Ok(Self::Memory),
            other => Err(format!("unknown store backend {other:?} (expected postgres or memory)")),
        }
    }
}
