// Record schema and CSV ingestion.
// Nothing downstream of `ingest` touches raw tabular data.

pub mod grade;
pub mod ingest;
pub mod models;

pub use grade::{AchievementLevel, Grade};
pub use ingest::{ingest, IngestError};
pub use models::{Activity, Record, RecordEcho, Subject};
