// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Keeps the model from inventing facts that are not in the submitted record.
pub const GROUNDING_INSTRUCTION: &str = "\
중요: 모든 분석은 제공된 기록에 근거해야 합니다. \
기록에 없는 활동, 수상, 성적을 추정하거나 만들어내지 마세요.";

/// Response language for all record-analysis calls.
pub const KOREAN_ONLY_INSTRUCTION: &str = "답변은 한국어로 작성하세요.";
