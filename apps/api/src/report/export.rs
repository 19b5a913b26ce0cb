//! Markdown rendering of a composed [`Report`] for download.

use crate::analysis::{Domain, DomainOutcome};
use crate::record::Subject;
use crate::report::composer::Report;

pub const REPORT_TITLE: &str = "# 학생 생활기록부 분석 보고서";
pub const UNPARSED_NOTICE: &str = "분석 결과를 해석하지 못했습니다.";
pub const DEFAULT_FILENAME: &str = "analysis_report.md";

/// Renders the whole report. Domains appear in canonical order; unparsed
/// domains get an explicit notice instead of being left out.
pub fn to_markdown(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(REPORT_TITLE);
    out.push_str("\n\n");

    render_echo(report, &mut out);
    render_achievement(report, &mut out);

    for (index, domain) in Domain::ALL.iter().enumerate() {
        let Some(outcome) = report.analysis().get(*domain) else {
            continue;
        };
        out.push_str(&format!("## {}. {}\n\n", index + 1, domain.title()));
        render_domain(outcome, &mut out);
    }

    let unparsed = &report.completeness().unparsed;
    if !unparsed.is_empty() {
        out.push_str("---\n\n");
        out.push_str(&format!(
            "> 해석하지 못한 항목 ({}): {}\n",
            unparsed.len(),
            unparsed
                .iter()
                .map(|d| d.title())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    out
}

fn render_echo(report: &Report, out: &mut String) {
    let source = report.source();
    if let Some(name) = &source.student_name {
        out.push_str(&format!("- 학생: {name}\n"));
    }
    out.push_str(&format!(
        "- 작성 시각: {}\n",
        report.composed_at().format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!("- 기록 식별자: `{}`\n", source.fingerprint));
    out.push_str(&format!(
        "- 성적 기재 과목: {}개, 서술 분량: {}자\n\n",
        source.graded_subjects, source.narrative_chars
    ));
}

fn render_achievement(report: &Report, out: &mut String) {
    let summary = report.summary();
    out.push_str("## 교과 성취도 요약\n\n");

    if summary.subjects.is_empty() {
        out.push_str("성적이 기재된 과목이 없습니다.\n\n");
    } else {
        out.push_str("| 과목 | 성적 | 환산 점수 | 성취 수준 |\n");
        out.push_str("|---|---|---|---|\n");
        for s in &summary.subjects {
            out.push_str(&format!(
                "| {} | {} | {:.1} | {} |\n",
                s.subject,
                s.grade,
                s.normalized * 100.0,
                s.letter
            ));
        }
        out.push('\n');
    }

    if let (Some(mean), Some(letter)) = (summary.overall_mean, summary.overall_letter) {
        out.push_str(&format!("- 전체 평균: {:.1} ({letter})\n", mean * 100.0));
    }
    if let Some(core) = summary.core_mean {
        out.push_str(&format!("- 주요 과목 평균: {:.1}\n", core * 100.0));
    }
    out.push_str(&format!("- 상위 과목: {}\n", subject_list(&summary.top_subjects)));
    out.push_str(&format!(
        "- 성적 미기재 과목: {}\n",
        subject_list(&summary.incomplete_subjects)
    ));
    out.push_str(&format!(
        "- 세특 강점 과목: {}\n\n",
        subject_list(&summary.strength_subjects)
    ));
}

fn render_domain(outcome: &DomainOutcome, out: &mut String) {
    match outcome {
        DomainOutcome::Parsed(analysis) => {
            out.push_str(&analysis.text);
            out.push_str("\n\n");
            if !analysis.scores.is_empty() {
                out.push_str("| 항목 | 점수 |\n|---|---|\n");
                for score in &analysis.scores {
                    out.push_str(&format!("| {} | {} |\n", score.label, score.score));
                }
                out.push('\n');
            }
        }
        DomainOutcome::Unparsed { .. } => {
            out.push_str(&format!("_{UNPARSED_NOTICE}_\n\n"));
        }
    }
}

fn subject_list(subjects: &[Subject]) -> String {
    if subjects.is_empty() {
        return "없음".to_string();
    }
    subjects
        .iter()
        .map(|s| s.column())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::aggregate;
    use crate::analysis::client::RawResponse;
    use crate::analysis::parse;
    use crate::analysis::testing::response_for;
    use crate::record::models::fixtures::{letter, record_with};
    use crate::record::AchievementLevel::A;
    use crate::report::compose;

    fn report(response: &str) -> Report {
        let record = record_with(&[(Subject::Korean, letter(A), "성실함")], &[]);
        let raw = RawResponse {
            text: response.to_string(),
            attempts: 1,
        };
        compose(aggregate(&record, 3), parse(&raw, &Domain::ALL)).unwrap()
    }

    #[test]
    fn test_markdown_lists_every_domain_in_order() {
        let md = to_markdown(&report(&response_for(&Domain::ALL)));
        assert!(md.starts_with(REPORT_TITLE));
        let mut last = 0;
        for domain in Domain::ALL {
            let pos = md.find(domain.title()).unwrap();
            assert!(pos >= last, "{domain:?} out of order");
            last = pos;
        }
        assert!(!md.contains(UNPARSED_NOTICE));
    }

    #[test]
    fn test_markdown_marks_unparsed_domains() {
        let md = to_markdown(&report(&response_for(&[Domain::Academic])));
        assert_eq!(md.matches(UNPARSED_NOTICE).count(), Domain::ALL.len() - 1);
        assert!(md.contains("해석하지 못한 항목 (6)"));
    }

    #[test]
    fn test_markdown_achievement_table() {
        let md = to_markdown(&report(&response_for(&[Domain::Academic])));
        assert!(md.contains("| 국어 | A | 100.0 | A |"));
        assert!(md.contains("- 상위 과목: 국어"));
        assert!(md.contains("- 세특 강점 과목: 없음"));
    }
}
