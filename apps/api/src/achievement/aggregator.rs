use serde::{Deserialize, Serialize};

use crate::record::{AchievementLevel, Activity, Grade, Record, RecordEcho, Subject};

/// Narrative words that flag a subject as a noted strength.
const STRENGTH_KEYWORDS: &[&str] = &["우수", "탁월", "뛰어난"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAchievement {
    pub subject: Subject,
    pub grade: Grade,
    /// 0.0 – 1.0
    pub normalized: f64,
    pub letter: AchievementLevel,
    pub has_narrative: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCoverage {
    pub activity: Activity,
    pub narrative_chars: usize,
}

/// Locally computed grade statistics for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementSummary {
    pub source: RecordEcho,
    /// Graded subjects only, canonical order.
    pub subjects: Vec<SubjectAchievement>,
    /// Mean normalized score over graded subjects. `None` when nothing is graded.
    pub overall_mean: Option<f64>,
    pub overall_letter: Option<AchievementLevel>,
    /// Mean over graded core subjects (국어 수학 영어 한국사 사회 과학 정보).
    pub core_mean: Option<f64>,
    pub top_subjects: Vec<Subject>,
    /// Subjects with no grade, canonical order. Complement of `subjects`.
    pub incomplete_subjects: Vec<Subject>,
    pub strength_subjects: Vec<Subject>,
    pub activity_coverage: Vec<ActivityCoverage>,
}

/// Computes the achievement summary. Pure; no I/O.
///
/// Ranking sorts by normalized score descending with a stable sort over the
/// canonical subject order, so equal scores keep canonical order.
pub fn aggregate(record: &Record, top_n: usize) -> AchievementSummary {
    let mut subjects = Vec::new();
    let mut incomplete_subjects = Vec::new();
    let mut strength_subjects = Vec::new();

    for (subject, entry) in record.subjects() {
        if STRENGTH_KEYWORDS.iter().any(|k| entry.narrative.contains(k)) {
            strength_subjects.push(subject);
        }
        match entry.grade {
            Some(grade) => subjects.push(SubjectAchievement {
                subject,
                grade,
                normalized: grade.normalized(),
                letter: grade.letter(),
                has_narrative: !entry.narrative.trim().is_empty(),
            }),
            None => incomplete_subjects.push(subject),
        }
    }

    let overall_mean = mean(subjects.iter().map(|s| s.normalized));
    let core_mean = mean(
        subjects
            .iter()
            .filter(|s| s.subject.is_core())
            .map(|s| s.normalized),
    );

    let mut ranked: Vec<&SubjectAchievement> = subjects.iter().collect();
    ranked.sort_by(|a, b| b.normalized.total_cmp(&a.normalized));
    let top_subjects = ranked.iter().take(top_n).map(|s| s.subject).collect();

    let activity_coverage = record
        .activities()
        .map(|(activity, text)| ActivityCoverage {
            activity,
            narrative_chars: text.chars().count(),
        })
        .collect();

    AchievementSummary {
        source: record.echo(),
        subjects,
        overall_mean,
        overall_letter: overall_mean.map(AchievementLevel::from_normalized),
        core_mean,
        top_subjects,
        incomplete_subjects,
        strength_subjects,
        activity_coverage,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
