//! Response Parser: turns free-text model output into per-domain tagged results.
//!
//! Two shapes are accepted:
//! 1. A JSON object (optionally fenced) keyed by domain key or title.
//! 2. Markdown-ish text segmented by heading lines (`### [academic] 학업 역량 분석`,
//!    `1. 학업 역량 분석`, `**학업 역량 분석**`, ...).
//!
//! Parsing never fails: a domain that cannot be found becomes
//! [`DomainOutcome::Unparsed`] and the rest of the result is kept.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::analysis::client::RawResponse;
use crate::analysis::domains::Domain;
use crate::llm_client::strip_json_fences;

const MAX_SCORE: u32 = 100;
/// `#` heading lines longer than the title plus this many chars are treated as prose.
const HEADING_SLACK_CHARS: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainScore {
    pub label: String,
    /// 0 – 100
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAnalysis {
    pub text: String,
    pub highlights: Vec<String>,
    pub scores: Vec<DomainScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsedReason {
    /// No heading or key for the domain in the response.
    NotFound,
    /// The heading was there but nothing followed it.
    EmptySection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomainOutcome {
    Parsed(DomainAnalysis),
    Unparsed { reason: UnparsedReason },
}

impl DomainOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, DomainOutcome::Parsed(_))
    }

    pub fn analysis(&self) -> Option<&DomainAnalysis> {
        match self {
            DomainOutcome::Parsed(analysis) => Some(analysis),
            DomainOutcome::Unparsed { .. } => None,
        }
    }
}

/// Parsed output of one LLM invocation. Every requested domain is a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub domains: BTreeMap<Domain, DomainOutcome>,
    pub attempts: u32,
}

impl AnalysisResult {
    pub fn get(&self, domain: Domain) -> Option<&DomainOutcome> {
        self.domains.get(&domain)
    }

    pub fn parsed_domains(&self) -> Vec<Domain> {
        self.domains
            .iter()
            .filter(|(_, o)| o.is_parsed())
            .map(|(d, _)| *d)
            .collect()
    }

    pub fn unparsed_domains(&self) -> Vec<Domain> {
        self.domains
            .iter()
            .filter(|(_, o)| !o.is_parsed())
            .map(|(d, _)| *d)
            .collect()
    }
}

lazy_static! {
    // "- 공학 계열: 85", "• 의학: 70점", "자연과학 : 90/100"
    static ref SCORE_LINE_RE: Regex = Regex::new(
        r"^(?:[-*•·]\s*)?(?:\*\*)?(?P<label>[^:：*\n]{1,40}?)(?:\*\*)?\s*[:：]\s*(?P<score>\d{1,3})\s*(?:점|/\s*100|%)?\s*$"
    )
    .unwrap();
    static ref BULLET_RE: Regex = Regex::new(r"^(?:[-*•·]|\d+[.)])\s+(?P<item>.+)$").unwrap();
    static ref NUMBERED_HEADING_RE: Regex = Regex::new(r"^\d+[.)]\s*").unwrap();
}

/// Extracts one outcome per expected domain from the raw model text.
pub fn parse(raw: &RawResponse, expected: &[Domain]) -> AnalysisResult {
    let segments = match parse_json(&raw.text) {
        Some(segments) => {
            debug!("Parsed analysis response as JSON");
            segments
        }
        None => segment_by_headings(&raw.text, expected),
    };

    let mut domains = BTreeMap::new();
    for domain in expected {
        let outcome = match segments.get(domain) {
            None => DomainOutcome::Unparsed {
                reason: UnparsedReason::NotFound,
            },
            Some(segment) if segment.is_empty() => DomainOutcome::Unparsed {
                reason: UnparsedReason::EmptySection,
            },
            Some(segment) => DomainOutcome::Parsed(segment.clone().into_analysis()),
        };
        domains.insert(*domain, outcome);
    }

    let result = AnalysisResult {
        domains,
        attempts: raw.attempts,
    };
    let unparsed = result.unparsed_domains();
    if !unparsed.is_empty() {
        warn!(
            "Response left {} of {} domains unparsed: {}",
            unparsed.len(),
            expected.len(),
            unparsed.iter().map(|d| d.key()).collect::<Vec<_>>().join(", ")
        );
    }
    result
}

/// Body gathered for one domain before it is split into text, highlights and scores.
#[derive(Debug, Clone, Default)]
struct Segment {
    text: String,
    highlights: Vec<String>,
    scores: Vec<DomainScore>,
}

impl Segment {
    fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.highlights.is_empty() && self.scores.is_empty()
    }

    fn into_analysis(self) -> DomainAnalysis {
        let mut highlights = self.highlights;
        let mut scores = self.scores;
        for line in self.text.lines().map(str::trim) {
            match parse_score_line(line) {
                ScoreLine::Score(score) => {
                    if !scores.iter().any(|s| s.label == score.label) {
                        scores.push(score);
                    }
                }
                // Score syntax with a bad value is neither a score nor a highlight.
                ScoreLine::Rejected => {}
                ScoreLine::NotScore => {
                    if let Some(caps) = BULLET_RE.captures(line) {
                        highlights.push(caps["item"].trim().to_string());
                    }
                }
            }
        }
        DomainAnalysis {
            text: self.text.trim().to_string(),
            highlights,
            scores,
        }
    }
}

enum ScoreLine {
    Score(DomainScore),
    Rejected,
    NotScore,
}

fn parse_score_line(line: &str) -> ScoreLine {
    let Some(caps) = SCORE_LINE_RE.captures(line) else {
        return ScoreLine::NotScore;
    };
    let label = caps["label"].trim().to_string();
    let Ok(score) = caps["score"].parse::<u32>() else {
        return ScoreLine::Rejected;
    };
    if label.is_empty() {
        return ScoreLine::Rejected;
    }
    if score > MAX_SCORE {
        debug!("Dropping out-of-range score {score} for '{label}'");
        return ScoreLine::Rejected;
    }
    ScoreLine::Score(DomainScore {
        label,
        score: score as u8,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// JSON shape
// ────────────────────────────────────────────────────────────────────────────

fn parse_json(text: &str) -> Option<BTreeMap<Domain, Segment>> {
    let body = strip_json_fences(text);
    if !body.starts_with('{') {
        return None;
    }
    let object: Map<String, Value> = serde_json::from_str(body).ok()?;

    let mut segments = BTreeMap::new();
    for (key, value) in &object {
        let Some(domain) = domain_for_json_key(key) else {
            continue;
        };
        segments.insert(domain, segment_from_json(value));
    }
    Some(segments)
}

fn domain_for_json_key(key: &str) -> Option<Domain> {
    let key = key.trim();
    Domain::from_key(key).or_else(|| {
        let normalized = squash(key);
        Domain::ALL
            .into_iter()
            .find(|d| squash(d.title()) == normalized)
    })
}

fn segment_from_json(value: &Value) -> Segment {
    match value {
        Value::String(text) => Segment {
            text: text.clone(),
            ..Segment::default()
        },
        Value::Array(items) => Segment {
            highlights: items.iter().filter_map(json_text).collect(),
            ..Segment::default()
        },
        Value::Object(fields) => {
            let text = ["text", "summary", "analysis"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string();
            let highlights = ["highlights", "items"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(Value::as_array))
                .map(|items| items.iter().filter_map(json_text).collect())
                .unwrap_or_default();
            let scores = fields
                .get("scores")
                .and_then(Value::as_object)
                .map(|scores| {
                    scores
                        .iter()
                        .filter_map(|(label, v)| {
                            let score = v.as_f64()?.round();
                            (0.0..=MAX_SCORE as f64).contains(&score).then(|| DomainScore {
                                label: label.clone(),
                                score: score as u8,
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            Segment {
                text,
                highlights,
                scores,
            }
        }
        _ => Segment::default(),
    }
}

fn json_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ────────────────────────────────────────────────────────────────────────────
// Heading shape
// ────────────────────────────────────────────────────────────────────────────

/// Splits the text at heading lines. Headings are recognised for every domain so an
/// unrequested section still closes the one before it; its body is discarded.
fn segment_by_headings(text: &str, expected: &[Domain]) -> BTreeMap<Domain, Segment> {
    let mut segments: BTreeMap<Domain, Segment> = BTreeMap::new();
    let mut current: Option<Domain> = None;

    for line in text.lines() {
        if let Some(domain) = match_heading(line) {
            current = Some(domain);
            let segment = segments.entry(domain).or_default();
            if !segment.text.is_empty() {
                segment.text.push_str("\n\n");
            }
            continue;
        }
        if let Some(domain) = current {
            let segment = segments.entry(domain).or_default();
            segment.text.push_str(line);
            segment.text.push('\n');
        }
    }
    segments.retain(|domain, _| expected.contains(domain));
    segments
}

/// Returns the domain a heading line introduces, if the line is a heading at all.
///
/// `[key]` tags and `#` headings may carry extra words after the title. Numbered,
/// bold and bracketed lines must hold nothing but the title, optionally followed by
/// punctuation or a parenthetical, so list items that mention a title stay prose.
fn match_heading(line: &str) -> Option<Domain> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let is_markdown = trimmed.starts_with('#');
    let is_numbered = NUMBERED_HEADING_RE.is_match(trimmed);
    let is_bracketed = trimmed.starts_with('[');
    let is_bold = trimmed.starts_with("**") && trimmed.len() > 4 && trimmed[2..].contains("**");
    if !(is_markdown || is_numbered || is_bracketed || is_bold) {
        return None;
    }

    let stripped = trimmed.trim_start_matches('#').trim().trim_start_matches('*');
    let stripped = NUMBERED_HEADING_RE.replace(stripped, "");
    let stripped = stripped.trim_matches('*').trim();

    if let Some(domain) = Domain::ALL
        .into_iter()
        .find(|d| stripped.starts_with(&format!("[{}]", d.key())))
    {
        return Some(domain);
    }

    if is_markdown {
        let squashed = squash(stripped);
        return Domain::ALL.into_iter().find(|domain| {
            squashed.contains(&squash(domain.title()))
                && stripped.chars().count()
                    <= domain.title().chars().count() + HEADING_SLACK_CHARS
        });
    }

    let bare = bare_title(stripped);
    Domain::ALL
        .into_iter()
        .find(|domain| squash(domain.title()) == bare)
}

/// Reduces "[학업 역량 분석] (1학년):" to "학업역량분석".
fn bare_title(text: &str) -> String {
    let mut rest = text.trim().trim_start_matches('[');
    loop {
        let before = rest;
        rest = rest
            .trim_end_matches(|c: char| matches!(c, ':' | '：' | '.' | '*' | ']'))
            .trim_end();
        if rest.ends_with(')') || rest.ends_with('）') {
            if let Some(open) = rest.rfind(['(', '（']) {
                rest = rest[..open].trim_end();
            }
        }
        if rest == before {
            break;
        }
    }
    squash(rest.trim_start_matches('*'))
}

/// Drops whitespace so "학업역량 분석" and "학업 역량 분석" compare equal.
fn squash(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::response_for;

    fn raw(text: &str) -> RawResponse {
        RawResponse {
            text: text.to_string(),
            attempts: 1,
        }
    }

    #[test]
    fn test_well_formed_response_parses_every_present_domain() {
        let present = [Domain::Academic, Domain::CareerFit, Domain::Roadmap];
        let result = parse(&raw(&response_for(&present)), &Domain::ALL);

        assert_eq!(result.domains.len(), Domain::ALL.len());
        assert_eq!(result.parsed_domains(), present.to_vec());
        for domain in Domain::ALL {
            let parsed = result.get(domain).unwrap().is_parsed();
            assert_eq!(parsed, present.contains(&domain), "{domain:?}");
        }
    }

    #[test]
    fn test_all_domains_present_yields_zero_unparsed() {
        let result = parse(&raw(&response_for(&Domain::ALL)), &Domain::ALL);
        assert!(result.unparsed_domains().is_empty());
    }

    #[test]
    fn test_missing_domain_is_not_found() {
        let result = parse(&raw(&response_for(&[Domain::Academic])), &Domain::ALL);
        assert_eq!(
            result.get(Domain::Character),
            Some(&DomainOutcome::Unparsed {
                reason: UnparsedReason::NotFound
            })
        );
    }

    #[test]
    fn test_empty_section_is_marked() {
        let text = "### [academic] 학업 역량 분석\n\n### [character] 학생 특성 분석\n배려심이 깊음\n";
        let result = parse(&raw(text), &[Domain::Academic, Domain::Character]);
        assert_eq!(
            result.get(Domain::Academic),
            Some(&DomainOutcome::Unparsed {
                reason: UnparsedReason::EmptySection
            })
        );
        assert!(result.get(Domain::Character).unwrap().is_parsed());
    }

    #[test]
    fn test_garbage_response_marks_everything_unparsed() {
        let result = parse(&raw("죄송합니다. 요청을 처리할 수 없습니다."), &Domain::ALL);
        assert_eq!(result.unparsed_domains(), Domain::ALL.to_vec());
    }

    #[test]
    fn test_heading_drift_variants() {
        let text = "\
1. 학업 역량 분석
수학적 사고력이 돋보임
**학생 특성 분석**
성실하고 책임감이 강함
## 진로적합성 분석
공학 계열과 잘 맞음
[roadmap] 진로 로드맵
- 단기: 정보 올림피아드 준비
";
        let result = parse(&raw(text), &Domain::ALL);
        assert_eq!(
            result.parsed_domains(),
            vec![
                Domain::Academic,
                Domain::Character,
                Domain::CareerFit,
                Domain::Roadmap
            ]
        );
        let academic = result.get(Domain::Academic).unwrap().analysis().unwrap();
        assert_eq!(academic.text, "수학적 사고력이 돋보임");
    }

    #[test]
    fn test_title_inside_prose_is_not_a_heading() {
        let text = "### [academic] 학업 역량 분석\n1. 이 학생의 진로 적합성 분석 결과는 공학 분야와 관련이 높으며 다양한 근거가 있습니다.\n";
        let result = parse(&raw(text), &Domain::ALL);
        assert!(result.get(Domain::CareerFit).map(|o| !o.is_parsed()).unwrap());
        let academic = result.get(Domain::Academic).unwrap().analysis().unwrap();
        assert!(academic.text.contains("공학 분야"));
    }

    #[test]
    fn test_scores_and_highlights_extracted() {
        let text = "\
### [career_fit] 진로 적합성 분석
희망 진로와 역량이 잘 맞습니다.
- 공학 계열: 85
- 의약 계열: 70점
- 자연과학 : 90/100
- 예체능: 150
- 탐구 활동을 꾸준히 이어갈 것
";
        let result = parse(&raw(text), &[Domain::CareerFit]);
        let career = result.get(Domain::CareerFit).unwrap().analysis().unwrap();
        let scores: Vec<(&str, u8)> = career
            .scores
            .iter()
            .map(|s| (s.label.as_str(), s.score))
            .collect();
        assert_eq!(
            scores,
            vec![("공학 계열", 85), ("의약 계열", 70), ("자연과학", 90)]
        );
        assert!(career
            .highlights
            .contains(&"탐구 활동을 꾸준히 이어갈 것".to_string()));
        assert!(!career.highlights.iter().any(|h| h.contains("공학 계열")));
        assert!(!career.highlights.iter().any(|h| h.contains("예체능")));
    }

    #[test]
    fn test_out_of_range_score_is_neither_score_nor_highlight() {
        let text = "### [career_fit] 진로 적합성 분석\n- 예체능: 150\n- 공학 계열: 999점\n- 인문: 60\n";
        let result = parse(&raw(text), &[Domain::CareerFit]);
        let career = result.get(Domain::CareerFit).unwrap().analysis().unwrap();
        assert_eq!(
            career.scores,
            vec![DomainScore {
                label: "인문".into(),
                score: 60
            }]
        );
        assert!(career.highlights.is_empty(), "{:?}", career.highlights);
    }

    #[test]
    fn test_numbered_items_mentioning_titles_stay_in_their_section() {
        let text = "\
### [recommendations] 종합 제언
1. 학업 역량 분석 결과처럼 수학 심화 학습을 이어가기
2. 진로 로드맵에 맞춰 방학 중 체험 활동 참여
**학생 특성 분석 결과 리더십이 돋보이므로 학생회 활동 권장**
";
        let result = parse(&raw(text), &Domain::ALL);
        assert_eq!(result.parsed_domains(), vec![Domain::Recommendations]);
        for domain in [Domain::Academic, Domain::Roadmap, Domain::Character] {
            assert_eq!(
                result.get(domain),
                Some(&DomainOutcome::Unparsed {
                    reason: UnparsedReason::NotFound
                }),
                "{domain:?}"
            );
        }

        let recommendations = result
            .get(Domain::Recommendations)
            .unwrap()
            .analysis()
            .unwrap();
        assert!(recommendations.text.contains("수학 심화 학습"));
        assert!(recommendations.text.contains("방학 중 체험 활동"));
        assert!(recommendations.text.contains("학생회 활동 권장"));
        assert_eq!(recommendations.highlights.len(), 2);
    }

    #[test]
    fn test_numbered_and_bold_titles_with_punctuation_are_headings() {
        let text = "\
1) 학업 역량 분석:
성취도가 고름
**[학생 특성 분석]** (요약)
책임감이 강함
";
        let result = parse(&raw(text), &Domain::ALL);
        assert_eq!(
            result.parsed_domains(),
            vec![Domain::Academic, Domain::Character]
        );
        let academic = result.get(Domain::Academic).unwrap().analysis().unwrap();
        assert_eq!(academic.text, "성취도가 고름");
    }

    #[test]
    fn test_unrequested_heading_closes_previous_section() {
        let text = "### [academic] 학업 역량 분석\n우수함\n### [character] 학생 특성 분석\n배려심이 깊음\n";
        let result = parse(&raw(text), &[Domain::Academic]);
        assert_eq!(result.domains.len(), 1);
        let academic = result.get(Domain::Academic).unwrap().analysis().unwrap();
        assert_eq!(academic.text, "우수함");
        assert!(!academic.text.contains("배려심"));
    }

    #[test]
    fn test_repeated_heading_appends() {
        let text = "### [academic] 학업 역량 분석\n첫째\n### [academic] 학업 역량 분석\n둘째\n";
        let result = parse(&raw(text), &[Domain::Academic]);
        let academic = result.get(Domain::Academic).unwrap().analysis().unwrap();
        assert!(academic.text.contains("첫째"));
        assert!(academic.text.contains("둘째"));
    }

    #[test]
    fn test_only_expected_domains_are_keys() {
        let result = parse(&raw(&response_for(&Domain::ALL)), &[Domain::Academic]);
        assert_eq!(result.domains.len(), 1);
        assert!(result.get(Domain::Academic).unwrap().is_parsed());
    }

    #[test]
    fn test_json_response_fenced() {
        let text = r#"```json
{
  "academic": "전 과목에서 고른 성취를 보임",
  "진로 적합성 분석": {
    "summary": "공학 계열 적합",
    "highlights": ["코딩 동아리 활동"],
    "scores": {"공학": 88, "경영": 140}
  },
  "roadmap": ["단기: 자격증 취득", "장기: 연구원"],
  "character": ""
}
```"#;
        let result = parse(&raw(text), &Domain::ALL);
        assert!(result.get(Domain::Academic).unwrap().is_parsed());
        assert!(result.get(Domain::Roadmap).unwrap().is_parsed());
        assert_eq!(
            result.get(Domain::Character),
            Some(&DomainOutcome::Unparsed {
                reason: UnparsedReason::EmptySection
            })
        );
        assert_eq!(
            result.get(Domain::Recommendations),
            Some(&DomainOutcome::Unparsed {
                reason: UnparsedReason::NotFound
            })
        );

        let career = result.get(Domain::CareerFit).unwrap().analysis().unwrap();
        assert_eq!(career.text, "공학 계열 적합");
        assert_eq!(career.highlights, vec!["코딩 동아리 활동".to_string()]);
        assert_eq!(
            career.scores,
            vec![DomainScore {
                label: "공학".into(),
                score: 88
            }]
        );
    }

    #[test]
    fn test_invalid_json_falls_back_to_headings() {
        let text = "{ not json\n### [academic] 학업 역량 분석\n우수\n";
        let result = parse(&raw(text), &[Domain::Academic]);
        assert!(result.get(Domain::Academic).unwrap().is_parsed());
    }

    #[test]
    fn test_attempts_carried_through() {
        let mut response = raw(&response_for(&[Domain::Academic]));
        response.attempts = 3;
        assert_eq!(parse(&response, &Domain::ALL).attempts, 3);
    }
}
