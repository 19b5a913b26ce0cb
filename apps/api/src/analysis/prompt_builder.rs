//! Prompt Builder: serializes a [`Record`] into a size-bounded analysis prompt.
//!
//! Order is fixed: subjects (canonical), activities (canonical), then the
//! career aspiration when present. When the rendered prompt exceeds the
//! character budget, narratives are shortened from the end of the prompt
//! backwards, so activity text gives way before subject 세특.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::domains::Domain;
use crate::analysis::prompts::{
    ACTIVITY_SECTION_TITLE, CAREER_ASPIRATION_LABEL, CLOSING_INSTRUCTION, EMPTY_NARRATIVE,
    PROMPT_INTRO, REQUEST_SECTION_TITLE, RESPONSE_FORMAT_INSTRUCTION, SUBJECT_SECTION_TITLE,
    UNGRADED_LABEL,
};
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, KOREAN_ONLY_INSTRUCTION};
use crate::record::Record;

/// Appended to every shortened narrative.
pub const TRUNCATION_MARKER: &str = "…[이하 생략]";

#[derive(Debug, Error)]
pub enum PromptError {
    /// `minimum` is the prompt length with every narrative reduced to the marker.
    /// Narratives no longer than the marker are left as they are.
    #[error("Prompt too large: needs at least {minimum} characters, budget is {budget}")]
    TooLarge { budget: usize, minimum: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionGroup {
    Subject,
    Activity,
    Aspiration,
}

/// One `(label, text)` pair drawn from the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptSection {
    pub group: SectionGroup,
    pub label: String,
    /// Fixed line rendered above the text (label plus grade for subjects).
    pub header: String,
    pub text: String,
    pub truncated: bool,
}

/// Immutable, budget-checked prompt. Construct with [`build`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptSpec {
    sections: Vec<PromptSection>,
    domains: Vec<Domain>,
    budget: usize,
}

impl PromptSpec {
    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    /// Domains the prompt asks the model to answer, in order.
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn truncated_labels(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.truncated)
            .map(|s| s.label.as_str())
            .collect()
    }

    /// Length of [`PromptSpec::render`] in characters.
    pub fn char_len(&self) -> usize {
        self.render().chars().count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(PROMPT_INTRO);
        out.push_str("\n\n");

        out.push_str(SUBJECT_SECTION_TITLE);
        out.push('\n');
        for section in self.sections.iter().filter(|s| s.group == SectionGroup::Subject) {
            push_section(&mut out, section);
        }

        out.push_str(ACTIVITY_SECTION_TITLE);
        out.push('\n');
        for section in self.sections.iter().filter(|s| s.group != SectionGroup::Subject) {
            push_section(&mut out, section);
        }

        out.push_str(REQUEST_SECTION_TITLE);
        out.push('\n');
        out.push_str(RESPONSE_FORMAT_INSTRUCTION);
        out.push('\n');
        out.push_str(GROUNDING_INSTRUCTION);
        out.push('\n');
        out.push_str(KOREAN_ONLY_INSTRUCTION);
        out.push_str("\n\n");
        for domain in &self.domains {
            out.push_str(&format!(
                "### [{}] {}\n{}\n\n",
                domain.key(),
                domain.title(),
                domain.instruction()
            ));
        }

        out.push_str(CLOSING_INSTRUCTION);
        out
    }
}

fn push_section(out: &mut String, section: &PromptSection) {
    out.push_str(&section.header);
    out.push('\n');
    if section.text.is_empty() {
        out.push_str(EMPTY_NARRATIVE);
    } else {
        out.push_str(&section.text);
    }
    out.push_str("\n\n");
}

/// Builds the prompt for `record`, truncating narratives to fit `budget` characters.
///
/// The smallest prompt this can produce has every narrative reduced to
/// [`TRUNCATION_MARKER`]; below that, [`PromptError::TooLarge`] is returned.
pub fn build(record: &Record, budget: usize) -> Result<PromptSpec, PromptError> {
    let mut sections = Vec::new();

    for (subject, entry) in record.subjects() {
        let grade = entry
            .grade
            .map(|g| g.to_string())
            .unwrap_or_else(|| UNGRADED_LABEL.to_string());
        sections.push(PromptSection {
            group: SectionGroup::Subject,
            label: subject.column().to_string(),
            header: format!("[{}] 등급: {}", subject.column(), grade),
            text: entry.narrative.trim().to_string(),
            truncated: false,
        });
    }

    for (activity, text) in record.activities() {
        sections.push(PromptSection {
            group: SectionGroup::Activity,
            label: activity.column().to_string(),
            header: format!("[{}]", activity.column()),
            text: text.trim().to_string(),
            truncated: false,
        });
    }

    if let Some(aspiration) = record.career_aspiration() {
        sections.push(PromptSection {
            group: SectionGroup::Aspiration,
            label: CAREER_ASPIRATION_LABEL.to_string(),
            header: format!("[{CAREER_ASPIRATION_LABEL}]"),
            text: aspiration.trim().to_string(),
            truncated: false,
        });
    }

    let mut spec = PromptSpec {
        sections,
        domains: Domain::ALL.to_vec(),
        budget,
    };

    let full_len = spec.char_len();
    let mut overflow = full_len.saturating_sub(budget);
    if overflow > 0 {
        debug!("Prompt is {full_len} chars, budget {budget}: truncating {overflow} chars");
        for section in spec.sections.iter_mut().rev() {
            if overflow == 0 {
                break;
            }
            overflow -= truncate_section(section, overflow);
        }
    }

    let len = spec.char_len();
    if len > budget {
        warn!("Prompt cannot fit budget {budget} even fully truncated ({len} chars)");
        return Err(PromptError::TooLarge {
            budget,
            minimum: len,
        });
    }

    let truncated = spec.truncated_labels();
    if !truncated.is_empty() {
        warn!("Prompt truncated sections: {}", truncated.join(", "));
    }
    Ok(spec)
}

/// Shortens `section.text` by up to `needed` characters, keeping room for the
/// marker. Returns how many characters the rendered prompt shrank by.
///
/// A narrative is never shorter than the marker once truncated, so text already
/// that short is left untouched and contributes nothing.
fn truncate_section(section: &mut PromptSection, needed: usize) -> usize {
    let len = section.text.chars().count();
    let marker_len = TRUNCATION_MARKER.chars().count();
    if len <= marker_len {
        return 0;
    }

    let reduction = needed.min(len - marker_len);
    let keep = len - marker_len - reduction;
    let mut text: String = section.text.chars().take(keep).collect();
    text.push_str(TRUNCATION_MARKER);
    section.text = text;
    section.truncated = true;
    reduction
}
