// Report composition and the derived outputs (Markdown download, chart series).

pub mod chart;
pub mod composer;
pub mod export;

pub use chart::ReportCharts;
pub use composer::{compose, ComposeError, Report};
pub use export::to_markdown;
