use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::pipeline::Pipeline;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; every request gets its own pipeline run.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Holds the analysis capability (`Arc<dyn AnalysisCapability>`); tests swap in a stub.
    pub pipeline: Pipeline,
    /// Cancelled on shutdown so in-flight runs abandon their remote calls.
    pub shutdown: CancellationToken,
}
