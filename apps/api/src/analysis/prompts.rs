// Analysis prompt templates.
// All fixed text of the record-analysis prompt lives here; the builder only
// fills in record content and the domain list.

pub const ANALYSIS_SYSTEM: &str = "\
당신은 학생 데이터를 분석하는 전문가입니다. \
객관적인 데이터를 기반으로 학생의 강점을 발견하고 약점을 보완하는 방향으로 발전 가능성을 제시해주세요. \
특히 진로 적합성과 학업 개선 방안에 중점을 두세요.";

pub const PROMPT_INTRO: &str = "\
다음은 한 학생의 학교생활기록부 데이터입니다. \
이를 바탕으로 학생의 특성과 발전 가능성을 분석해주세요.";

pub const SUBJECT_SECTION_TITLE: &str = "## 교과 세부능력 및 특기사항";
pub const ACTIVITY_SECTION_TITLE: &str = "## 창의적 체험활동 및 행동특성";
pub const REQUEST_SECTION_TITLE: &str = "## 요청 분석 항목";

/// Placeholder rendered for an empty narrative so the model sees the gap explicitly.
pub const EMPTY_NARRATIVE: &str = "(기록 없음)";
pub const UNGRADED_LABEL: &str = "미기재";
pub const CAREER_ASPIRATION_LABEL: &str = "진로희망";

pub const RESPONSE_FORMAT_INSTRUCTION: &str = "\
각 항목은 아래 제목 줄을 그대로 사용해 시작하고, 제목 줄 다음에 내용을 작성하세요. \
근거가 부족한 항목도 제목은 유지하고 판단 근거가 부족하다고 명시하세요.";

pub const CLOSING_INSTRUCTION: &str = "\
분석은 객관적 데이터를 기반으로 하되, 긍정적이고 발전적인 관점에서 작성해주세요. \
권장하는 활동과 전략은 구체적이고 실행 가능한 것으로 제안해주세요.";
