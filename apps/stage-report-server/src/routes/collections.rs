use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::ReportResult;
use crate::services::report::ReportService;
use crate::state::AppState;

pub(crate) async fn list_collections(
    State(reports): State<Arc<ReportService>>,
) -> ReportResult<Json<Vec<String>>> {
    Ok(Json(reports.list_collection_names().await?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/collections", get(list_collections))
}
