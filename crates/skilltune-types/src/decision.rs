use crate::{PromptId, TuneError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence tier reported by the judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Lenient parse used for judge output ("high", "HIGH", " Medium ")
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" | "med" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        };
        f.write_str(s)
    }
}

/// Raw verdict of a classifier for one prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    pub invoked: bool,
    pub confidence: Confidence,
    pub justification: String,
}

impl Judgement {
    pub fn invoke(confidence: Confidence, justification: impl Into<String>) -> Self {
        Self {
            invoked: true,
            confidence,
            justification: justification.into(),
        }
    }

    pub fn no_invoke(confidence: Confidence, justification: impl Into<String>) -> Self {
        Self {
            invoked: false,
            confidence,
            justification: justification.into(),
        }
    }
}

/// One judge decision for one prompt in one evaluation round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub prompt_id: PromptId,
    pub invoked: bool,
    pub confidence: Confidence,
    pub justification: String,
    /// Set when the judge failed and the decision was substituted
    #[serde(default)]
    pub forced: bool,
}

impl Decision {
    pub fn from_judgement(prompt_id: PromptId, judgement: Judgement) -> Self {
        Self {
            prompt_id,
            invoked: judgement.invoked,
            confidence: judgement.confidence,
            justification: judgement.justification,
            forced: false,
        }
    }

    /// Fail-closed placeholder for a judge call that errored, timed out or panicked
    pub fn forced_no_invoke(prompt_id: PromptId, reason: impl fmt::Display) -> Self {
        Self {
            prompt_id,
            invoked: false,
            confidence: Confidence::Low,
            justification: TuneError::JudgeCallFailed {
                prompt: prompt_id.to_string(),
                reason: reason.to_string(),
            }
            .to_string(),
            forced: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_no_invoke_names_prompt_and_reason() {
        let decision = Decision::forced_no_invoke(PromptId(3), "connection refused");
        assert!(decision.forced);
        assert!(!decision.invoked);
        assert_eq!(decision.confidence, Confidence::Low);
        assert_eq!(
            decision.justification,
            "judge call failed for prompt p03: connection refused"
        );
    }
}
