use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use std::sync::Arc;

use crate::error::{ReportError, ReportResult};
use crate::services::report::derived::DerivedRecord;
use crate::services::report::window::CalendarWindow;
use crate::services::report::ReportService;
use crate::state::AppState;

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub(crate) struct DataQuery {
    /// Source collection to list.
    collection: Option<String>,
    /// none, day, week, month or previous-month.
    filter: Option<String>,
}

pub(crate) async fn filtered_data(
    State(reports): State<Arc<ReportService>>,
    query: Result<Query<DataQuery>, QueryRejection>,
) -> ReportResult<Json<Vec<DerivedRecord>>> {
    let Query(query) = query?;
    let window = match query.filter.as_deref() {
        Some(raw) => raw
            .parse::<CalendarWindow>()
            .map_err(ReportError::Validation)?,
        None => CalendarWindow::None,
    };
    let records = reports
        .filtered_records(query.collection.as_deref(), window, Utc::now())
        .await?;
    Ok(Json(records))
}

pub(crate) async fn all_data(
    State(reports): State<Arc<ReportService>>,
) -> ReportResult<Json<Vec<DerivedRecord>>> {
    Ok(Json(reports.all_records().await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/data", get(filtered_data))
        .route("/all-data", get(all_data))
}
