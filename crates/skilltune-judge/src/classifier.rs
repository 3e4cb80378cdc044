//! The judge seam: anything that can decide INVOKE / NO_INVOKE for one prompt

use async_trait::async_trait;
use skilltune_types::{Judgement, SkillDescriptor};
use std::time::Duration;
use thiserror::Error;

/// Judge failures. The matcher turns every one of these into a fail-closed decision.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid judge response: {0}")]
    InvalidResponse(String),

    #[error("cannot decide: {0}")]
    Undecidable(String),
}

pub type Result<T> = std::result::Result<T, JudgeError>;

/// Semantic classifier deciding whether a skill should handle a request.
///
/// Implementations see exactly the prompt text and the descriptor. They must
/// keep no memory between calls: every call is an isolated judgement.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Short identifier used in logs and reports
    fn name(&self) -> &str;

    async fn classify(&self, prompt_text: &str, descriptor: &SkillDescriptor) -> Result<Judgement>;
}
