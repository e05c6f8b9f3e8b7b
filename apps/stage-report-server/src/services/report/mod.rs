pub mod assembler;
pub mod derived;
pub mod duration;
pub mod fields;
pub mod groups;
pub mod grouper;
pub mod window;

use chrono::{DateTime, FixedOffset, Utc};
use futures::TryStreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{ReportError, ReportResult};
use crate::record::RawRecord;
use crate::store::DocumentStore;
use assembler::{AggregatedReport, ReportShape};
use derived::DerivedRecord;
use fields::{resolve_interval, FieldRoles};
use groups::StageGroupTable;
use grouper::CorrelationGrouper;
use window::{CalendarWindow, ClockWindow, WindowFilter};

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub offset: FixedOffset,
    pub shape: ReportShape,
    pub scan_timeout: Duration,
    /// When non-empty, the only collections the single-collection listing will serve.
    pub filtered_collections: Vec<String>,
}

/// Builds stage reports from full scans of the document store.
///
/// Every call starts from scratch; nothing is cached between requests. Scans are bounded by
/// `scan_timeout` and abandoned when the shutdown token fires.
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    groups: Arc<StageGroupTable>,
    settings: ReportSettings,
    cancel: CancellationToken,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        groups: Arc<StageGroupTable>,
        settings: ReportSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            groups,
            settings,
            cancel,
        }
    }

    pub async fn list_collection_names(&self) -> ReportResult<Vec<String>> {
        self.bounded("collections", async {
            let collections = self.store.list_collections().await?;
            Ok::<Vec<String>, ReportError>(collections.into_iter().map(|info| info.name).collect())
        })
        .await
    }

    /// Derived records of one collection whose start falls in the calendar window.
    pub async fn filtered_records(
        &self,
        collection: Option<&str>,
        window: CalendarWindow,
        now: DateTime<Utc>,
    ) -> ReportResult<Vec<DerivedRecord>> {
        let collection = collection
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ReportError::validation("Collection required"))?;
        if !self.settings.filtered_collections.is_empty()
            && !self
                .settings
                .filtered_collections
                .iter()
                .any(|allowed| allowed == collection)
        {
            return Err(ReportError::validation(format!(
                "Invalid collection. Only {} supported.",
                quoted_list(&self.settings.filtered_collections)
            )));
        }

        let filter = WindowFilter::calendar(window, now, &self.settings.offset);
        let group = self.groups.classify(collection);
        let offset = self.settings.offset;
        let mut derived = Vec::new();
        let mut skipped = 0_u64;
        self.bounded("data", async {
            let mut records = self.store.find(collection);
            while let Some(record) = records.try_next().await? {
                let accepted = resolve_interval(&record, &FieldRoles::collection_listing())
                    .filter(|resolved| filter.admits(resolved.start.millis(), &offset))
                    .and_then(|resolved| {
                        DerivedRecord::derive(collection, group, &record, resolved, &offset)
                    });
                match accepted {
                    Some(record) => derived.push(record),
                    None => skipped += 1,
                }
            }
            Ok::<(), ReportError>(())
        })
        .await?;

        tracing::debug!(
            collection = %collection,
            window = ?window,
            returned = derived.len(),
            skipped,
            "collection listing built"
        );
        Ok(derived)
    }

    /// Per-correlation-id stage report across every collection.
    pub async fn aggregated_report(&self, clock: Option<ClockWindow>) -> ReportResult<AggregatedReport> {
        let mut grouper = CorrelationGrouper::new(
            &self.groups,
            FieldRoles::aggregation(),
            WindowFilter::clock(clock),
            self.settings.offset,
        );
        let mut scanned_collections = 0_usize;
        self.bounded("aggregated-data", async {
            for info in self.store.list_collections().await? {
                let mut records = self.store.find(&info.name);
                while let Some(record) = records.try_next().await? {
                    let _ = grouper.push(&info.name, &record);
                }
                scanned_collections += 1;
            }
            Ok::<(), ReportError>(())
        })
        .await?;

        let (buckets, stats) = grouper.finish();
        tracing::debug!(
            collections = scanned_collections,
            accepted = stats.accepted,
            missing_key = stats.missing_key,
            unresolved = stats.unresolved,
            outside_window = stats.outside_window,
            correlation_ids = buckets.len(),
            "aggregated report built"
        );
        Ok(assembler::assemble(self.settings.shape, buckets))
    }

    /// Every resolvable record of every collection, tagged with its collection and stage.
    pub async fn all_records(&self) -> ReportResult<Vec<DerivedRecord>> {
        let roles = FieldRoles::aggregation();
        let offset = self.settings.offset;
        let mut derived = Vec::new();
        self.bounded("all-data", async {
            for info in self.store.list_collections().await? {
                let group = self.groups.classify(&info.name);
                let mut records = self.store.find(&info.name);
                while let Some(record) = records.try_next().await? {
                    if let Some(record) = derive_unfiltered(&info.name, group, &record, &roles, &offset) {
                        derived.push(record);
                    }
                }
            }
            Ok::<(), ReportError>(())
        })
        .await?;
        Ok(derived)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        scan: impl Future<Output = ReportResult<T>>,
    ) -> ReportResult<T> {
        let timeout = self.settings.scan_timeout;
        tokio::select! {
            _ = self.cancel.cancelled() => {
                tracing::warn!(operation, "report scan cancelled");
                Err(ReportError::Cancelled)
            }
            result = tokio::time::timeout(timeout, scan) => match result {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(operation, timeout_secs = timeout.as_secs(), "report scan deadline exceeded");
                    Err(ReportError::DeadlineExceeded(timeout))
                }
            },
        }
    }
}

fn derive_unfiltered(
    collection: &str,
    group: groups::StageGroup,
    record: &RawRecord,
    roles: &FieldRoles,
    offset: &FixedOffset,
) -> Option<DerivedRecord> {
    let resolved = resolve_interval(record, roles)?;
    DerivedRecord::derive(collection, group, record, resolved, offset)
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
