//! CSV ingestion: turns one exported record CSV into a typed [`Record`].
//!
//! Expected shape: a header row carrying every canonical subject and activity
//! column (any order, aliases allowed) and exactly one student row. Subject
//! cells read `"<grade>, <세특>"`; activity cells are plain narrative.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;

use crate::record::grade::Grade;
use crate::record::models::{Activity, Record, Subject, SubjectEntry};

const CAREER_ASPIRATION_COLUMN: &str = "진로희망";
const STUDENT_NAME_COLUMN: &str = "이름";
/// Grade token meaning "no grade recorded" while keeping the narrative.
const ABSENT_GRADE_MARKER: &str = "-";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Schema error: missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Schema error: column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("Schema error: expected exactly one student row, found {0}")]
    RowCount(usize),

    #[error("Schema error: input is not valid UTF-8")]
    Encoding,

    #[error("Schema error: malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Field format error: subject '{subject}' has unparseable grade '{raw}'")]
    FieldFormat { subject: String, raw: String },
}

impl IngestError {
    /// True for structural problems with the file; false for a bad value in a well-formed file.
    pub fn is_schema(&self) -> bool {
        !matches!(self, IngestError::FieldFormat { .. })
    }
}

/// Where each recognized column lives in the header.
#[derive(Debug, Default)]
struct ColumnMap {
    subjects: HashMap<Subject, usize>,
    activities: HashMap<Activity, usize>,
    career_aspiration: Option<usize>,
    student_name: Option<usize>,
}

/// Parses raw CSV bytes into a [`Record`]. Pure: reads only the given slice.
pub fn ingest(raw: &[u8]) -> Result<Record, IngestError> {
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    std::str::from_utf8(raw).map_err(|_| IngestError::Encoding)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(raw);

    let headers = reader.headers()?.clone();
    let columns = map_columns(&headers)?;

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }
    if rows.len() != 1 {
        return Err(IngestError::RowCount(rows.len()));
    }
    let row = &rows[0];
    let cell = |idx: usize| row.get(idx).unwrap_or("").trim();

    let mut subjects = BTreeMap::new();
    for subject in Subject::ALL {
        let entry = parse_subject_cell(subject, cell(columns.subjects[&subject]))?;
        subjects.insert(subject, entry);
    }

    let activities = Activity::ALL
        .iter()
        .map(|a| (*a, cell(columns.activities[a]).to_string()))
        .collect();

    let optional = |idx: Option<usize>| {
        idx.map(cell)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let record = Record::new(
        subjects,
        activities,
        optional(columns.career_aspiration),
        optional(columns.student_name),
    );
    debug!(
        "Ingested record: {} graded subjects",
        record.subjects().filter(|(_, e)| e.grade.is_some()).count()
    );
    Ok(record)
}

fn map_columns(headers: &csv::StringRecord) -> Result<ColumnMap, IngestError> {
    let mut columns = ColumnMap::default();

    for (idx, name) in headers.iter().enumerate() {
        if let Some(subject) = Subject::ALL
            .into_iter()
            .find(|s| s.column() == name || s.aliases().contains(&name))
        {
            if columns.subjects.insert(subject, idx).is_some() {
                return Err(IngestError::DuplicateColumn(subject.column().to_string()));
            }
        } else if let Some(activity) = Activity::ALL
            .into_iter()
            .find(|a| a.column() == name || a.aliases().contains(&name))
        {
            if columns.activities.insert(activity, idx).is_some() {
                return Err(IngestError::DuplicateColumn(activity.column().to_string()));
            }
        } else if name == CAREER_ASPIRATION_COLUMN {
            columns.career_aspiration = Some(idx);
        } else if name == STUDENT_NAME_COLUMN {
            columns.student_name = Some(idx);
        } else {
            debug!("Ignoring unrecognized column '{name}'");
        }
    }

    let missing: Vec<String> = Subject::ALL
        .iter()
        .filter(|s| !columns.subjects.contains_key(s))
        .map(|s| s.column().to_string())
        .chain(
            Activity::ALL
                .iter()
                .filter(|a| !columns.activities.contains_key(a))
                .map(|a| a.column().to_string()),
        )
        .collect();

    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }
    Ok(columns)
}

/// `""` → no grade, no narrative. `"A"` → grade only. `"A, text"` → both.
/// `"-, text"` → narrative with the grade explicitly absent.
fn parse_subject_cell(subject: Subject, cell: &str) -> Result<SubjectEntry, IngestError> {
    if cell.is_empty() {
        return Ok(SubjectEntry::empty());
    }

    let (token, narrative) = match cell.split_once(',') {
        Some((token, rest)) => (token.trim(), rest.trim()),
        None => (cell, ""),
    };

    let grade = if token == ABSENT_GRADE_MARKER {
        None
    } else {
        Some(Grade::parse(token).ok_or_else(|| IngestError::FieldFormat {
            subject: subject.column().to_string(),
            raw: token.to_string(),
        })?)
    };

    Ok(SubjectEntry {
        grade,
        narrative: narrative.to_string(),
    })
}
