use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::analysis::RetryPolicy;

/// Anthropic credential. Never printed: `Debug` shows a placeholder.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: String) -> Self {
        Self(key)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Upper bound on the rendered prompt, in chars.
    pub prompt_budget: usize,
    pub top_subjects: usize,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl AnalysisSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.backoff_base,
            max_delay: self.backoff_max,
            attempt_timeout: self.attempt_timeout,
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            prompt_budget: 12_000,
            top_subjects: 3,
            max_attempts: retry.max_attempts,
            attempt_timeout: retry.attempt_timeout,
            backoff_base: retry.base_delay,
            backoff_max: retry.max_delay,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: ApiKey,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub analysis: AnalysisSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so parsing is testable without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AnalysisSettings::default();
        let analysis = AnalysisSettings {
            prompt_budget: parse_or(&lookup, "PROMPT_CHAR_BUDGET", defaults.prompt_budget)?,
            top_subjects: parse_or(&lookup, "TOP_SUBJECTS", defaults.top_subjects)?,
            max_attempts: parse_or(&lookup, "ANALYSIS_MAX_ATTEMPTS", defaults.max_attempts)?,
            attempt_timeout: Duration::from_secs(parse_or(
                &lookup,
                "ANALYSIS_TIMEOUT_SECS",
                defaults.attempt_timeout.as_secs(),
            )?),
            backoff_base: Duration::from_millis(parse_or(
                &lookup,
                "ANALYSIS_BACKOFF_MS",
                defaults.backoff_base.as_millis() as u64,
            )?),
            backoff_max: Duration::from_millis(parse_or(
                &lookup,
                "ANALYSIS_BACKOFF_MAX_MS",
                defaults.backoff_max.as_millis() as u64,
            )?),
        };
        if analysis.max_attempts == 0 {
            bail!("ANALYSIS_MAX_ATTEMPTS must be at least 1");
        }
        if analysis.attempt_timeout.is_zero() {
            bail!("ANALYSIS_TIMEOUT_SECS must be at least 1");
        }

        Ok(Config {
            anthropic_api_key: ApiKey::new(require(&lookup, "ANTHROPIC_API_KEY")?),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 1024 * 1024)?,
            analysis,
        })
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.max_upload_bytes, 1_048_576);
        assert_eq!(config.analysis, AnalysisSettings::default());
        assert_eq!(config.analysis.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_overrides_parse() {
        let config = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("PORT", "9000"),
            ("PROMPT_CHAR_BUDGET", "4000"),
            ("TOP_SUBJECTS", "5"),
            ("ANALYSIS_MAX_ATTEMPTS", "4"),
            ("ANALYSIS_TIMEOUT_SECS", "30"),
            ("ANALYSIS_BACKOFF_MS", "250"),
            ("ANALYSIS_BACKOFF_MAX_MS", "2000"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.analysis.prompt_budget, 4000);
        assert_eq!(config.analysis.top_subjects, 5);
        let policy = config.analysis.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let err = Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_bad_number_names_variable() {
        let err = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("ANALYSIS_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("ANALYSIS_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_debug_never_shows_key() {
        let config =
            Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "sk-ant-very-secret")])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-very-secret"));
        assert_eq!(config.anthropic_api_key.expose(), "sk-ant-very-secret");
    }
}
