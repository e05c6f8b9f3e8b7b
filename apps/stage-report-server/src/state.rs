use crate::services::report::ReportService;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<ReportService>,
}

impl FromRef<AppState> for Arc<ReportService> {
    fn from_ref(state: &AppState) -> Arc<ReportService> {
        state.reports.clone()
    }
}
