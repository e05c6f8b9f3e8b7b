use crate::config::ReportConfig;
use crate::record::RawRecord;
use crate::services::report::assembler::ReportShape;
use crate::services::report::ReportService;
use crate::state::AppState;
use crate::store::{DocumentStore, MemoryDocumentStore, StoreBackend};
use crate::time::DEFAULT_REPORT_OFFSET_MINUTES;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn test_config() -> ReportConfig {
    ReportConfig {
        store_backend: StoreBackend::Memory,
        database_url: None,
        store_schema: "public".to_string(),
        fixture_path: None,
        scan_timeout_seconds: 5,
        utc_offset_minutes: DEFAULT_REPORT_OFFSET_MINUTES,
        report_shape: ReportShape::Grouped,
        filtered_collections: vec![],
        stage_groups_path: None,
    }
}

/// Three collections, two correlated ids and one record without an id. All starts fall
/// shortly after the epoch, i.e. between 05:30 and 05:45 IST on 1/1/1970.
pub fn sample_store() -> MemoryDocumentStore {
    MemoryDocumentStore::new()
        .with_collection(
            "lr_collection",
            vec![
                RawRecord::new()
                    .with("lr_number", "LR001")
                    .with("start_time", 1_000)
                    .with("finalized", 601_000),
                RawRecord::new()
                    .with("lr_number", "LR002")
                    .with("createdAt", 2_000)
                    .with("updatedAt", 62_000),
            ],
        )
        .with_collection(
            "cc_collection",
            vec![RawRecord::new()
                .with("lrNumber", "LR001")
                .with("count_start_time", 700_000)
                .with("count_end_time", 1_000_000)],
        )
        .with_collection(
            "qc_lady",
            vec![
                RawRecord::new()
                    .with("lrNumber", "LR002")
                    .with("start_time", 3_000)
                    .with("finalize_time", 123_000),
                RawRecord::new().with("start_time", 5_000).with("finalized", 65_000),
            ],
        )
}

pub fn test_state(store: impl DocumentStore + 'static) -> AppState {
    let config = test_config();
    let groups = config.stage_group_table().expect("stage groups");
    let settings = config.report_settings().expect("report settings");
    let reports = ReportService::new(
        Arc::new(store),
        Arc::new(groups),
        settings,
        CancellationToken::new(),
    );
    AppState {
        reports: Arc::new(reports),
    }
}
