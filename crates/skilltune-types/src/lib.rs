//! Skilltune Types - Core data model for skill trigger evaluation
//!
//! Descriptors, labeled prompts, judge decisions, score reports and the
//! tuning history records shared by every skilltune crate.

mod decision;
mod descriptor;
mod error;
mod prompt;
mod report;
mod tuning;

pub use decision::{Confidence, Decision, Judgement};
pub use descriptor::SkillDescriptor;
pub use error::{Result, TuneError};
pub use prompt::{
    BlindPrompt, Category, Prompt, PromptId, SeedFailure, PROMPTS_PER_CATEGORY, PROMPT_SET_SIZE,
};
pub use report::{Diagnosis, Failure, FailureKind, ScoreReport, Tally, Verdict, VerdictThresholds};
pub use tuning::{
    DescriptorChange, EscalationSummary, FixPattern, IterationRecord, ReadySummary,
    SessionOutcome, TuningState,
};
