// Narrative analysis: prompt construction, the retrying LLM call, and response parsing.
// All LLM calls go through llm_client via the AnalysisCapability trait.

pub mod client;
pub mod domains;
pub mod parser;
pub mod prompt_builder;
pub mod prompts;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{AnalysisClient, AnalysisError};
pub use domains::Domain;
pub use parser::{parse, AnalysisResult, DomainOutcome};
pub use prompt_builder::{build, PromptError};
pub use retry::RetryPolicy;
