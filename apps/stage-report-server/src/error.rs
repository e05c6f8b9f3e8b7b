use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Caller input is missing or malformed.
    #[error("{0}")]
    Validation(String),
    /// The document store failed while enumerating or scanning.
    #[error("{0}")]
    UpstreamStore(String),
    #[error("report scan exceeded its {}s deadline", .0.as_secs())]
    DeadlineExceeded(Duration),
    #[error("report scan cancelled: server is shutting down")]
    Cancelled,
}

impl ReportError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<StoreError> for ReportError {
    fn from(err: StoreError) -> Self {
        Self::UpstreamStore(err.to_string())
    }
}

impl From<QueryRejection> for ReportError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "report request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "report request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_classes() {
        assert_eq!(
            ReportError::validation("Collection required").status(),
            StatusCode::BAD_REQUEST
        );
        assert!(ReportError::UpstreamStore("down".into())
            .status()
            .is_server_error());
        assert!(ReportError::DeadlineExceeded(Duration::from_secs(30))
            .status()
            .is_server_error());
        assert!(ReportError::Cancelled.status().is_server_error());
    }

    #[test]
    fn store_errors_pass_message_through() {
        let err: ReportError = StoreError::InvalidRecord {
            collection: "audit".into(),
            reason: "expected a JSON object, got string".into(),
        }
        .into();
        assert!(matches!(err, ReportError::UpstreamStore(_)));
        assert!(err.to_string().contains("audit"));
    }

    #[tokio::test]
    async fn renders_error_body() -> anyhow::Result<()> {
        let response = ReportError::validation("Collection required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body, serde_json::json!({"error": "Collection required"}));
        Ok(())
    }
}
