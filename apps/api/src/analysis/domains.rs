use std::fmt;

use serde::{Deserialize, Serialize};

/// An analysis domain the LLM is asked to answer. Declaration order is the
/// order domains appear in the prompt and in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Academic,
    Character,
    CareerFit,
    GrowthStrategy,
    ParentGuidance,
    Roadmap,
    Recommendations,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Academic,
        Domain::Character,
        Domain::CareerFit,
        Domain::GrowthStrategy,
        Domain::ParentGuidance,
        Domain::Roadmap,
        Domain::Recommendations,
    ];

    /// Stable key used in the response heading format (`### [key] title`) and in JSON.
    pub fn key(self) -> &'static str {
        match self {
            Domain::Academic => "academic",
            Domain::Character => "character",
            Domain::CareerFit => "career_fit",
            Domain::GrowthStrategy => "growth_strategy",
            Domain::ParentGuidance => "parent_guidance",
            Domain::Roadmap => "roadmap",
            Domain::Recommendations => "recommendations",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Domain::Academic => "학업 역량 분석",
            Domain::Character => "학생 특성 분석",
            Domain::CareerFit => "진로 적합성 분석",
            Domain::GrowthStrategy => "학업 발전 전략",
            Domain::ParentGuidance => "학부모 상담 가이드",
            Domain::Roadmap => "진로 로드맵",
            Domain::Recommendations => "종합 제언",
        }
    }

    /// What the model should cover under this heading.
    pub fn instruction(self) -> &'static str {
        match self {
            Domain::Academic => {
                "전반적인 학업 수준, 과목별 특징과 강점, 학습 태도와 참여도를 분석하세요."
            }
            Domain::Character => {
                "성격 및 행동 특성, 두드러진 역량과 관심사, 대인관계와 리더십을 분석하세요."
            }
            Domain::CareerFit => {
                "희망 진로와 현재 역량의 연관성을 분석하고, 적합한 계열별 적합도를 \
                 `- 계열명: 점수` 형식(0~100)으로 한 줄씩 제시하세요."
            }
            Domain::GrowthStrategy => {
                "보완이 필요한 과목과 구체적인 학업 개선 전략을 `- ` 목록으로 제시하세요."
            }
            Domain::ParentGuidance => "학부모 상담 시 다룰 포인트와 가정에서의 지원 방안을 제시하세요.",
            Domain::Roadmap => "단기, 중기, 장기 목표를 구분해 진로 실현 로드맵을 제시하세요.",
            Domain::Recommendations => "학생의 주요 강점과 향후 발전을 위한 구체적 조언을 제시하세요.",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Domain::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_roundtrip() {
        for domain in Domain::ALL {
            assert_eq!(Domain::from_key(domain.key()), Some(domain));
        }
        assert_eq!(Domain::from_key("unknown"), None);
    }

    #[test]
    fn test_serde_uses_key() {
        for domain in Domain::ALL {
            let json = serde_json::to_string(&domain).unwrap();
            assert_eq!(json, format!("\"{}\"", domain.key()));
        }
    }
}
