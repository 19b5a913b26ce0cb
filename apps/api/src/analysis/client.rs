//! Analysis Client: drives the capability through the retry state machine.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::prompt_builder::PromptSpec;
use crate::analysis::prompts::ANALYSIS_SYSTEM;
use crate::analysis::retry::{RetryPolicy, RetryState};
use crate::llm_client::{AnalysisCapability, LlmError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis unavailable after {attempts} attempts: {cause}")]
    Unavailable {
        attempts: u32,
        #[source]
        cause: LlmError,
    },

    #[error("Analysis rejected: {0}")]
    Rejected(#[source] LlmError),
}

/// Raw model output plus how many attempts it took.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawResponse {
    pub text: String,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct AnalysisClient {
    capability: Arc<dyn AnalysisCapability>,
    policy: RetryPolicy,
}

impl AnalysisClient {
    pub fn new(capability: Arc<dyn AnalysisCapability>, policy: RetryPolicy) -> Self {
        Self { capability, policy }
    }

    /// Sends the rendered prompt, retrying transient failures with exponential backoff.
    ///
    /// Each attempt is exactly one capability call, bounded by `attempt_timeout`.
    /// Dropping the returned future abandons any in-flight call; no state survives.
    pub async fn analyze(&self, prompt: &PromptSpec) -> Result<RawResponse, AnalysisError> {
        let rendered = prompt.render();
        let mut state = RetryState::start();

        loop {
            state = match state {
                RetryState::Attempting { attempt } => {
                    info!(
                        "Analysis attempt {}/{} ({} prompt chars)",
                        attempt,
                        self.policy.max_attempts,
                        rendered.chars().count()
                    );
                    let outcome = self.attempt(&rendered).await;
                    self.policy.on_outcome(attempt, outcome)
                }
                RetryState::Backoff {
                    attempt,
                    delay,
                    cause,
                } => {
                    warn!(
                        "Analysis attempt {} failed ({}), retrying after {}ms...",
                        attempt,
                        cause,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    self.policy.after_backoff(attempt)
                }
                RetryState::Succeeded { attempts, value } => {
                    info!("Analysis succeeded after {attempts} attempt(s)");
                    return Ok(RawResponse {
                        text: value,
                        attempts,
                    });
                }
                RetryState::Exhausted { attempts, cause } => {
                    warn!("Analysis exhausted after {attempts} attempts: {cause}");
                    return Err(AnalysisError::Unavailable { attempts, cause });
                }
                RetryState::Rejected { attempts, cause } => {
                    warn!("Analysis rejected on attempt {attempts}: {cause}");
                    return Err(AnalysisError::Rejected(cause));
                }
            };
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<String, LlmError> {
        let timeout = self.policy.attempt_timeout;
        match tokio::time::timeout(timeout, self.capability.invoke(prompt, ANALYSIS_SYSTEM)).await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        }
    }
}
