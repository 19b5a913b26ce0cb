use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::record::grade::Grade;

/// Subjects recognized in the record export, in canonical order.
///
/// Declaration order is the canonical order: `Ord` and [`Subject::ALL`] both follow it,
/// and every downstream ordering (prompt serialization, ranking tie-breaks) relies on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "국어")]
    Korean,
    #[serde(rename = "수학")]
    Math,
    #[serde(rename = "영어")]
    English,
    #[serde(rename = "한국사")]
    KoreanHistory,
    #[serde(rename = "사회")]
    Social,
    #[serde(rename = "과학")]
    Science,
    #[serde(rename = "과학탐구실험")]
    ScienceLab,
    #[serde(rename = "정보")]
    Informatics,
    #[serde(rename = "체육")]
    PhysicalEducation,
    #[serde(rename = "음악")]
    Music,
    #[serde(rename = "미술")]
    Art,
}

impl Subject {
    pub const ALL: [Subject; 11] = [
        Subject::Korean,
        Subject::Math,
        Subject::English,
        Subject::KoreanHistory,
        Subject::Social,
        Subject::Science,
        Subject::ScienceLab,
        Subject::Informatics,
        Subject::PhysicalEducation,
        Subject::Music,
        Subject::Art,
    ];

    /// Subjects counted in the core-subject average.
    pub const CORE: [Subject; 7] = [
        Subject::Korean,
        Subject::Math,
        Subject::English,
        Subject::KoreanHistory,
        Subject::Social,
        Subject::Science,
        Subject::Informatics,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Subject::Korean => "국어",
            Subject::Math => "수학",
            Subject::English => "영어",
            Subject::KoreanHistory => "한국사",
            Subject::Social => "사회",
            Subject::Science => "과학",
            Subject::ScienceLab => "과학탐구실험",
            Subject::Informatics => "정보",
            Subject::PhysicalEducation => "체육",
            Subject::Music => "음악",
            Subject::Art => "미술",
        }
    }

    /// Header names used by older exports for the same column.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Subject::Social => &["통합사회"],
            Subject::Science => &["통합과학"],
            _ => &[],
        }
    }

    pub fn is_core(self) -> bool {
        Subject::CORE.contains(&self)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Creative-activity categories (창의적 체험활동 + 행동특성), in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Activity {
    #[serde(rename = "자율활동")]
    Autonomous,
    #[serde(rename = "동아리활동")]
    Club,
    #[serde(rename = "진로활동")]
    Career,
    #[serde(rename = "행동특성 및 발달사항")]
    Behavior,
}

impl Activity {
    pub const ALL: [Activity; 4] = [
        Activity::Autonomous,
        Activity::Club,
        Activity::Career,
        Activity::Behavior,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Activity::Autonomous => "자율활동",
            Activity::Club => "동아리활동",
            Activity::Career => "진로활동",
            Activity::Behavior => "행동특성 및 발달사항",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Activity::Autonomous => &["자율"],
            Activity::Club => &["동아리"],
            Activity::Career => &["진로"],
            Activity::Behavior => &["행특"],
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Grade plus 세특 narrative for one subject. `grade == None` means the export
/// explicitly carried no grade for the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectEntry {
    pub grade: Option<Grade>,
    pub narrative: String,
}

impl SubjectEntry {
    pub fn empty() -> Self {
        Self {
            grade: None,
            narrative: String::new(),
        }
    }
}

/// One student's record.
///
/// Only `record::ingest` constructs this, and it always fills every canonical
/// subject and activity key, so the accessors below never miss.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    subjects: BTreeMap<Subject, SubjectEntry>,
    activities: BTreeMap<Activity, String>,
    career_aspiration: Option<String>,
    student_name: Option<String>,
}

/// Identifies a record without carrying its content. Travels with the report for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEcho {
    /// Hex SHA-256 over the record's canonical serialization.
    pub fingerprint: String,
    pub student_name: Option<String>,
    pub graded_subjects: usize,
    pub narrative_chars: usize,
}

impl Record {
    pub(crate) fn new(
        subjects: BTreeMap<Subject, SubjectEntry>,
        activities: BTreeMap<Activity, String>,
        career_aspiration: Option<String>,
        student_name: Option<String>,
    ) -> Self {
        debug_assert!(Subject::ALL.iter().all(|s| subjects.contains_key(s)));
        debug_assert!(Activity::ALL.iter().all(|a| activities.contains_key(a)));
        Self {
            subjects,
            activities,
            career_aspiration,
            student_name,
        }
    }

    pub fn subject(&self, subject: Subject) -> &SubjectEntry {
        &self.subjects[&subject]
    }

    pub fn activity(&self, activity: Activity) -> &str {
        &self.activities[&activity]
    }

    /// Subjects in canonical order.
    pub fn subjects(&self) -> impl Iterator<Item = (Subject, &SubjectEntry)> {
        self.subjects.iter().map(|(s, e)| (*s, e))
    }

    /// Activities in canonical order.
    pub fn activities(&self) -> impl Iterator<Item = (Activity, &str)> {
        self.activities.iter().map(|(a, t)| (*a, t.as_str()))
    }

    pub fn career_aspiration(&self) -> Option<&str> {
        self.career_aspiration.as_deref()
    }

    pub fn student_name(&self) -> Option<&str> {
        self.student_name.as_deref()
    }

    pub fn echo(&self) -> RecordEcho {
        let mut hasher = Sha256::new();
        for (subject, entry) in self.subjects() {
            hasher.update(subject.column().as_bytes());
            hasher.update([0x1f]);
            if let Some(grade) = entry.grade {
                hasher.update(grade.to_string().as_bytes());
            }
            hasher.update([0x1f]);
            hasher.update(entry.narrative.as_bytes());
            hasher.update([0x1e]);
        }
        for (activity, text) in self.activities() {
            hasher.update(activity.column().as_bytes());
            hasher.update([0x1f]);
            hasher.update(text.as_bytes());
            hasher.update([0x1e]);
        }
        if let Some(aspiration) = &self.career_aspiration {
            hasher.update(aspiration.as_bytes());
        }

        let narrative_chars = self
            .subjects
            .values()
            .map(|e| e.narrative.chars().count())
            .chain(self.activities.values().map(|t| t.chars().count()))
            .sum();

        RecordEcho {
            fingerprint: hex::encode(hasher.finalize()),
            student_name: self.student_name.clone(),
            graded_subjects: self.subjects.values().filter(|e| e.grade.is_some()).count(),
            narrative_chars,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::record::grade::AchievementLevel;

    #[test]
    fn test_canonical_order_matches_all() {
        let mut sorted = Subject::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Subject::ALL.to_vec());

        let mut sorted = Activity::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Activity::ALL.to_vec());
    }

    #[test]
    fn test_subject_serializes_as_column_name() {
        let json = serde_json::to_string(&Subject::ScienceLab).unwrap();
        assert_eq!(json, "\"과학탐구실험\"");
        let json = serde_json::to_string(&Activity::Behavior).unwrap();
        assert_eq!(json, "\"행동특성 및 발달사항\"");
    }

    #[test]
    fn test_echo_is_stable_and_content_sensitive() {
        let a = record_with(&[(Subject::Korean, letter(AchievementLevel::A), "성실함")], &[]);
        let b = record_with(&[(Subject::Korean, letter(AchievementLevel::A), "성실함")], &[]);
        let c = record_with(&[(Subject::Korean, letter(AchievementLevel::B), "성실함")], &[]);

        assert_eq!(a.echo(), b.echo());
        assert_ne!(a.echo().fingerprint, c.echo().fingerprint);
        assert_eq!(a.echo().fingerprint.len(), 64);
    }

    #[test]
    fn test_echo_counts() {
        let record = record_with(
            &[
                (Subject::Korean, letter(AchievementLevel::A), "성실함"),
                (Subject::Math, None, "노력함"),
            ],
            &[(Activity::Club, "코딩 동아리")],
        );
        let echo = record.echo();
        assert_eq!(echo.graded_subjects, 1);
        assert_eq!(echo.narrative_chars, 3 + 3 + 6);
        assert!(echo.student_name.is_none());
    }

    #[test]
    fn test_blank_record_has_every_key() {
        let record = blank_record();
        assert_eq!(record.subjects().count(), Subject::ALL.len());
        assert_eq!(record.activities().count(), Activity::ALL.len());
        assert_eq!(record.subject(Subject::Art), &SubjectEntry::empty());
    }
}
