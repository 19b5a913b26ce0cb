// Local achievement statistics. No network, no LLM.

pub mod aggregator;

pub use aggregator::{aggregate, AchievementSummary};
