use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::{ReportError, ReportResult};
use crate::services::report::assembler::AggregatedReport;
use crate::services::report::window::ClockWindow;
use crate::services::report::ReportService;
use crate::state::AppState;

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub(crate) struct AggregatedQuery {
    /// Local clock time, `HH:MM`.
    #[serde(alias = "startTime", alias = "start")]
    start_time: Option<String>,
    #[serde(alias = "endTime", alias = "end")]
    end_time: Option<String>,
}

pub(crate) async fn aggregated_data(
    State(reports): State<Arc<ReportService>>,
    query: Result<Query<AggregatedQuery>, QueryRejection>,
) -> ReportResult<Json<AggregatedReport>> {
    let Query(query) = query?;
    let clock = ClockWindow::from_bounds(query.start_time.as_deref(), query.end_time.as_deref())
        .map_err(ReportError::Validation)?;
    Ok(Json(reports.aggregated_report(clock).await?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/aggregated-data", get(aggregated_data))
}
