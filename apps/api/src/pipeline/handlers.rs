use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::achievement::AchievementSummary;
use crate::errors::AppError;
use crate::report::export::DEFAULT_FILENAME;
use crate::report::{to_markdown, Report, ReportCharts};
use crate::state::AppState;

/// Multipart field carrying the CSV export.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub report: Report,
    pub charts: ReportCharts,
}

/// POST /api/v1/summary
pub async fn handle_summary(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AchievementSummary>, AppError> {
    let csv = read_upload(multipart).await?;
    let summary = state.pipeline.summarize(&csv)?;
    Ok(Json(summary))
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let csv = read_upload(multipart).await?;
    let report = state.pipeline.run_cancellable(&csv, &state.shutdown).await?;
    let charts = ReportCharts::for_report(&report);
    Ok(Json(AnalyzeResponse { report, charts }))
}

/// POST /api/v1/analyze/markdown
pub async fn handle_analyze_markdown(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let csv = read_upload(multipart).await?;
    let report = state.pipeline.run_cancellable(&csv, &state.shutdown).await?;
    let markdown = to_markdown(&report);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DEFAULT_FILENAME}\""),
            ),
        ],
        markdown,
    ))
}

/// Pulls the CSV bytes out of the `file` field; other fields are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(AppError::from_multipart)? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let bytes = field.bytes().await.map_err(AppError::from_multipart)?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        debug!("Received upload: {} bytes", bytes.len());
        return Ok(bytes);
    }
    Err(AppError::Validation(format!(
        "Missing multipart field '{UPLOAD_FIELD}'"
    )))
}
