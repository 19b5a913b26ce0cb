use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::achievement::AchievementSummary;
use crate::analysis::{AnalysisResult, Domain};
use crate::record::{RecordEcho, Subject};

#[derive(Debug, Error, PartialEq)]
pub enum ComposeError {
    #[error("Subject '{0}' appears more than once in the summary")]
    DuplicateSubject(Subject),

    #[error("Subject '{0}' is missing from the summary")]
    MissingSubject(Subject),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: String, value: f64 },

    #[error("Analysis result contains no domains")]
    NoDomains,
}

/// Which requested domains made it through parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub parsed: Vec<Domain>,
    pub unparsed: Vec<Domain>,
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        self.unparsed.is_empty()
    }
}

/// Final merged artifact. Read-only once composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    composed_at: DateTime<Utc>,
    source: RecordEcho,
    summary: AchievementSummary,
    analysis: AnalysisResult,
    completeness: Completeness,
}

impl Report {
    pub fn composed_at(&self) -> DateTime<Utc> {
        self.composed_at
    }

    pub fn source(&self) -> &RecordEcho {
        &self.source
    }

    pub fn summary(&self) -> &AchievementSummary {
        &self.summary
    }

    pub fn analysis(&self) -> &AnalysisResult {
        &self.analysis
    }

    pub fn completeness(&self) -> &Completeness {
        &self.completeness
    }
}

/// Validates the two halves of a run and merges them into a [`Report`].
pub fn compose(
    summary: AchievementSummary,
    analysis: AnalysisResult,
) -> Result<Report, ComposeError> {
    compose_at(summary, analysis, Utc::now())
}

fn compose_at(
    summary: AchievementSummary,
    analysis: AnalysisResult,
    composed_at: DateTime<Utc>,
) -> Result<Report, ComposeError> {
    check_subject_coverage(&summary)?;
    check_ranges(&summary)?;
    if analysis.domains.is_empty() {
        return Err(ComposeError::NoDomains);
    }

    let completeness = Completeness {
        parsed: analysis.parsed_domains(),
        unparsed: analysis.unparsed_domains(),
    };
    info!(
        "Composed report for record {}: {} parsed, {} unparsed domains",
        &summary.source.fingerprint[..summary.source.fingerprint.len().min(12)],
        completeness.parsed.len(),
        completeness.unparsed.len()
    );

    Ok(Report {
        composed_at,
        source: summary.source.clone(),
        summary,
        analysis,
        completeness,
    })
}

fn check_subject_coverage(summary: &AchievementSummary) -> Result<(), ComposeError> {
    let mut seen = Vec::with_capacity(Subject::ALL.len());
    let listed = summary
        .subjects
        .iter()
        .map(|s| s.subject)
        .chain(summary.incomplete_subjects.iter().copied());
    for subject in listed {
        if seen.contains(&subject) {
            return Err(ComposeError::DuplicateSubject(subject));
        }
        seen.push(subject);
    }
    match Subject::ALL.iter().find(|s| !seen.contains(s)) {
        Some(missing) => Err(ComposeError::MissingSubject(*missing)),
        None => Ok(()),
    }
}

fn check_ranges(summary: &AchievementSummary) -> Result<(), ComposeError> {
    let values = summary
        .subjects
        .iter()
        .map(|s| (format!("{} normalized score", s.subject), Some(s.normalized)))
        .chain([
            ("overall mean".to_string(), summary.overall_mean),
            ("core mean".to_string(), summary.core_mean),
        ]);
    for (field, value) in values {
        if let Some(value) = value {
            if !(0.0..=1.0).contains(&value) {
                return Err(ComposeError::OutOfRange { field, value });
            }
        }
    }
    Ok(())
}
