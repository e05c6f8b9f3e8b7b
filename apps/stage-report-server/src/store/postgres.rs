use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use futures::TryStreamExt;
use serde_json::Value as JsonValue;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use tokio::sync::mpsc;

use super::{CollectionInfo, DocumentStore, StoreError};
use crate::record::RawRecord;

// Rows buffered between the database cursor and the aggregation loop.
const FIND_BUFFER: usize = 256;

/// Treats every base table of one Postgres schema as a collection of JSON documents.
#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
    schema: String,
}

impl PgDocumentStore {
    pub fn new(db: PgPool, schema: impl Into<String>) -> Self {
        Self {
            db,
            schema: schema.into(),
        }
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(crate) fn find_sql(schema: &str, collection: &str) -> String {
    format!(
        "SELECT to_jsonb(t) AS doc FROM {}.{} t",
        quote_ident(schema),
        quote_ident(collection)
    )
}

async fn collection_exists(db: &PgPool, schema: &str, collection: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_name = $2
              AND table_type = 'BASE TABLE'
        )
        "#,
    )
    .bind(schema)
    .bind(collection)
    .fetch_one(db)
    .await
}

fn into_record(collection: &str, doc: JsonValue) -> Result<RawRecord, StoreError> {
    RawRecord::try_from(doc).map_err(|reason| StoreError::InvalidRecord {
        collection: collection.to_string(),
        reason,
    })
}

async fn stream_rows(
    db: PgPool,
    schema: String,
    collection: String,
    tx: mpsc::Sender<Result<RawRecord, StoreError>>,
) {
    match collection_exists(&db, &schema, &collection).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(schema = %schema, collection = %collection, "collection not found; no records");
            return;
        }
        Err(err) => {
            let _ = tx.send(Err(err.into())).await;
            return;
        }
    }

    let sql = find_sql(&schema, &collection);
    let mut rows = sqlx::query_scalar::<_, SqlJson<JsonValue>>(&sql).fetch(&db);
    loop {
        let item = match rows.try_next().await {
            Ok(Some(SqlJson(doc))) => into_record(&collection, doc),
            Ok(None) => break,
            Err(err) => Err(err.into()),
        };
        let failed = item.is_err();
        if tx.send(item).await.is_err() {
            // Receiver dropped: the scan hit its deadline or was cancelled.
            tracing::debug!(collection = %collection, "record consumer went away; stopping scan");
            break;
        }
        if failed {
            break;
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(&self.schema)
        .fetch_all(&self.db)
        .await?;
        Ok(names.into_iter().map(CollectionInfo::new).collect())
    }

    fn find<'a>(&'a self, collection: &'a str) -> BoxStream<'a, Result<RawRecord, StoreError>> {
        let (tx, rx) = mpsc::channel(FIND_BUFFER);
        tokio::spawn(stream_rows(
            self.db.clone(),
            self.schema.clone(),
            collection.to_string(),
            tx,
        ));
        stream::unfold(rx, |mut rx| async move {
            let item = rx.recv().await?;
            Some((item, rx))
        })
        .boxed()
    }
}
