use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl AppError {
    pub fn from_multipart(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
        }
    }

    /// Status and stable machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            AppError::Pipeline(e) => match e {
                PipelineError::Ingest(e) if e.is_schema() => {
                    (StatusCode::BAD_REQUEST, "SCHEMA_ERROR")
                }
                PipelineError::Ingest(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "FIELD_FORMAT_ERROR")
                }
                PipelineError::Prompt(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PROMPT_TOO_LARGE"),
                PipelineError::Analysis(AnalysisError::Unavailable { .. }) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "ANALYSIS_UNAVAILABLE")
                }
                PipelineError::Analysis(AnalysisError::Rejected(_)) => {
                    (StatusCode::BAD_GATEWAY, "ANALYSIS_REJECTED")
                }
                PipelineError::Compose(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                PipelineError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
            },
        }
    }
}

impl From<crate::record::IngestError> for AppError {
    fn from(e: crate::record::IngestError) -> Self {
        AppError::Pipeline(PipelineError::Ingest(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Validation(msg) | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Pipeline(PipelineError::Analysis(e)) => {
                tracing::error!("Analysis error: {e}");
                match e {
                    AnalysisError::Unavailable { attempts, .. } => format!(
                        "The analysis service is unavailable after {attempts} attempts. \
                         Please resubmit the same file later."
                    ),
                    AnalysisError::Rejected(_) => {
                        "The analysis service rejected the request".to_string()
                    }
                }
            }
            AppError::Pipeline(PipelineError::Compose(e)) => {
                tracing::error!("Compose error: {e}");
                "An internal server error occurred".to_string()
            }
            AppError::Pipeline(e) => e.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
