//! Scripted stand-in for the LLM, used across the crate's tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm_client::{AnalysisCapability, LlmError};

#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    /// HTTP failure with this status (429/5xx transient, 4xx rejected).
    Status(u16),
    /// Never completes; only the caller's timeout ends it.
    Hang,
}

/// Plays back `steps` in order, then repeats the last one forever.
pub struct ScriptedCapability {
    steps: Mutex<VecDeque<Step>>,
    last: Step,
    calls: AtomicU32,
}

impl ScriptedCapability {
    pub fn new(steps: Vec<Step>) -> Self {
        let last = steps.last().cloned().unwrap_or(Step::Hang);
        Self {
            steps: Mutex::new(steps.into()),
            last,
            calls: AtomicU32::new(0),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Step::Reply(text.to_string())])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisCapability for ScriptedCapability {
    async fn invoke(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut steps = self.steps.lock().unwrap();
            steps.pop_front().unwrap_or_else(|| self.last.clone())
        };
        match step {
            Step::Reply(text) => Ok(text),
            Step::Status(status) => Err(LlmError::Api {
                status,
                message: format!("scripted {status}"),
            }),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// A response answering exactly `domains`, in the heading format the prompt asks for.
pub fn response_for(domains: &[crate::analysis::domains::Domain]) -> String {
    domains
        .iter()
        .map(|d| {
            format!(
                "### [{}] {}\n{} 관련 분석 내용입니다.\n- 핵심 관찰 사항\n\n",
                d.key(),
                d.title(),
                d.title()
            )
        })
        .collect()
}
