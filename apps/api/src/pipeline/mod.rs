// Pipeline: ingest → aggregate → prompt → analyze → parse → compose.
// Everything except the analysis call is local and synchronous.

pub mod handlers;

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::achievement::{aggregate, AchievementSummary};
use crate::analysis::{self, AnalysisClient, AnalysisError, PromptError};
use crate::config::AnalysisSettings;
use crate::llm_client::AnalysisCapability;
use crate::record::{ingest, IngestError};
use crate::report::{compose, ComposeError, Report};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Report composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("Run cancelled before analysis completed")]
    Cancelled,
}

#[derive(Clone)]
pub struct Pipeline {
    analysis: AnalysisClient,
    settings: AnalysisSettings,
}

impl Pipeline {
    pub fn new(capability: Arc<dyn AnalysisCapability>, settings: AnalysisSettings) -> Self {
        let analysis = AnalysisClient::new(capability, settings.retry_policy());
        Self { analysis, settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Local half only: no remote call is made.
    pub fn summarize(&self, raw: &[u8]) -> Result<AchievementSummary, PipelineError> {
        let record = ingest(raw)?;
        let summary = aggregate(&record, self.settings.top_subjects);
        info!(
            "Summarized record: {} graded, {} incomplete",
            summary.subjects.len(),
            summary.incomplete_subjects.len()
        );
        Ok(summary)
    }

    pub async fn run(&self, raw: &[u8]) -> Result<Report, PipelineError> {
        self.run_cancellable(raw, &CancellationToken::new()).await
    }

    /// Full run. The analysis call races `cancel`; on cancellation the in-flight
    /// call is dropped and no further attempts are made.
    pub async fn run_cancellable(
        &self,
        raw: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Report, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);

        async move {
            info!("Pipeline run started ({} bytes)", raw.len());

            let record = ingest(raw)?;
            let echo = record.echo();
            info!(
                "Ingested record {} ({} graded subjects, {} narrative chars)",
                &echo.fingerprint[..12],
                echo.graded_subjects,
                echo.narrative_chars
            );

            let summary = aggregate(&record, self.settings.top_subjects);
            info!(
                "Aggregated: overall mean {:?}, top {:?}",
                summary.overall_mean, summary.top_subjects
            );

            let prompt = analysis::build(&record, self.settings.prompt_budget)?;
            drop(record);
            let truncated = prompt.truncated_labels();
            if !truncated.is_empty() {
                warn!("Prompt truncated in: {}", truncated.join(", "));
            }
            info!(
                "Prompt built: {}/{} chars, {} domains",
                prompt.char_len(),
                prompt.budget(),
                prompt.domains().len()
            );

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Pipeline run cancelled during analysis");
                    return Err(PipelineError::Cancelled);
                }
                result = self.analysis.analyze(&prompt) => result?,
            };

            let result = analysis::parse(&response, prompt.domains());
            let report = compose(summary, result)?;
            info!(
                "Pipeline run finished: {} parsed, {} unparsed domains",
                report.completeness().parsed.len(),
                report.completeness().unparsed.len()
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
