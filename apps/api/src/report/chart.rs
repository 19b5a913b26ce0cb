// Chart-ready series derived from a composed report.
// Rendering is left to the client; these are plain label/value lists.

use serde::Serialize;

use crate::analysis::{Domain, DomainOutcome};
use crate::report::composer::Report;

/// Values are on a 0 – 100 scale, one per axis, in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSeries {
    pub title: String,
    pub axes: Vec<String>,
    pub values: Vec<f64>,
}

impl RadarSeries {
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

/// Both charts for one report, as returned by the analyze endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCharts {
    pub subjects: RadarSeries,
    pub career: Option<RadarSeries>,
}

impl ReportCharts {
    pub fn for_report(report: &Report) -> Self {
        Self {
            subjects: subject_radar(report),
            career: career_radar(report),
        }
    }
}

/// Graded subjects in canonical order, normalized score × 100.
pub fn subject_radar(report: &Report) -> RadarSeries {
    let subjects = &report.summary().subjects;
    RadarSeries {
        title: "과목별 성취도".to_string(),
        axes: subjects.iter().map(|s| s.subject.to_string()).collect(),
        values: subjects
            .iter()
            .map(|s| (s.normalized * 1000.0).round() / 10.0)
            .collect(),
    }
}

/// Career-fit scores, when the career domain parsed and carried any.
pub fn career_radar(report: &Report) -> Option<RadarSeries> {
    let analysis = match report.analysis().get(Domain::CareerFit)? {
        DomainOutcome::Parsed(analysis) if !analysis.scores.is_empty() => analysis,
        _ => return None,
    };
    Some(RadarSeries {
        title: "진로 적합도".to_string(),
        axes: analysis.scores.iter().map(|s| s.label.clone()).collect(),
        values: analysis.scores.iter().map(|s| f64::from(s.score)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::aggregate;
    use crate::analysis::client::RawResponse;
    use crate::analysis::parse;
    use crate::analysis::testing::response_for;
    use crate::record::models::fixtures::{letter, record_with};
    use crate::record::AchievementLevel::{A, C};
    use crate::record::{Grade, Subject};
    use crate::report::compose;

    fn report_with_response(text: &str) -> Report {
        let record = record_with(
            &[
                (Subject::Korean, letter(A), ""),
                (Subject::Math, Some(Grade::Rank(3)), ""),
                (Subject::Art, letter(C), ""),
            ],
            &[],
        );
        let raw = RawResponse {
            text: text.to_string(),
            attempts: 1,
        };
        compose(aggregate(&record, 3), parse(&raw, &Domain::ALL)).unwrap()
    }

    #[test]
    fn test_subject_radar_uses_graded_subjects() {
        let report = report_with_response(&response_for(&[Domain::Academic]));
        let radar = subject_radar(&report);
        assert_eq!(radar.axes, vec!["국어", "수학", "미술"]);
        assert_eq!(radar.values, vec![100.0, 75.0, 50.0]);
    }

    #[test]
    fn test_career_radar_from_scores() {
        let text = "### [career_fit] 진로 적합성 분석\n공학 계열과 잘 맞음\n- 공학: 90\n- 경영: 60점\n";
        let report = report_with_response(text);
        let radar = career_radar(&report).unwrap();
        assert_eq!(radar.axes, vec!["공학", "경영"]);
        assert_eq!(radar.values, vec![90.0, 60.0]);
    }

    #[test]
    fn test_career_radar_absent_without_scores() {
        let report = report_with_response(&response_for(&[Domain::CareerFit]));
        assert!(career_radar(&report).is_none());

        let report = report_with_response("no headings at all");
        let charts = ReportCharts::for_report(&report);
        assert!(charts.career.is_none());
        assert!(!charts.subjects.is_empty());
    }
}
