use crate::{Category, FailureKind, PromptId, ScoreReport, SkillDescriptor, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptor edit selected for a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixPattern {
    /// false negative in MUST_INVOKE
    AddTriggerTerms,
    /// false negative in SHOULD_INVOKE_EDGE
    BroadenPhrasing,
    /// false positive in SHOULD_NOT_INVOKE_EDGE
    AddNarrowingContext,
    /// false positive in MUST_NOT_INVOKE
    AddExclusion,
}

impl FixPattern {
    /// Fix lookup table. `None` for combinations a category cannot produce.
    pub fn for_failure(category: Category, kind: FailureKind) -> Option<Self> {
        match (category, kind) {
            (Category::MustInvoke, FailureKind::FalseNegative) => Some(FixPattern::AddTriggerTerms),
            (Category::ShouldInvokeEdge, FailureKind::FalseNegative) => {
                Some(FixPattern::BroadenPhrasing)
            }
            (Category::ShouldNotInvokeEdge, FailureKind::FalsePositive) => {
                Some(FixPattern::AddNarrowingContext)
            }
            (Category::MustNotInvoke, FailureKind::FalsePositive) => Some(FixPattern::AddExclusion),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            FixPattern::AddTriggerTerms => "add missing exact trigger term(s)",
            FixPattern::BroadenPhrasing => "add synonym(s) / broaden phrasing",
            FixPattern::AddNarrowingContext => "add disambiguating / narrowing context",
            FixPattern::AddExclusion => "add explicit exclusion language / narrow scope",
        }
    }
}

impl fmt::Display for FixPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One mutation applied to the descriptor during a tuning pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorChange {
    /// Tuning pass (1-based) that applied the change
    pub iteration: usize,
    pub prompt_id: PromptId,
    pub pattern: FixPattern,
    /// Terms added to the description; empty when nothing new could be added
    pub terms: Vec<String>,
    pub before: String,
    pub after: String,
}

impl DescriptorChange {
    pub fn changed_text(&self) -> bool {
        self.before != self.after
    }
}

/// One scored evaluation round, kept for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 0 for the baseline round, then one per tuning pass
    pub round: usize,
    pub descriptor: SkillDescriptor,
    pub report: ScoreReport,
    pub recorded_at: DateTime<Utc>,
}

impl IterationRecord {
    pub fn new(round: usize, descriptor: SkillDescriptor, report: ScoreReport) -> Self {
        Self {
            round,
            descriptor,
            report,
            recorded_at: Utc::now(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.report.verdict
    }
}

/// Tuning loop state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TuningState {
    Generating,
    Evaluating,
    Scoring,
    Tuning,
    Ready,
    EscalateToUser,
}

impl TuningState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TuningState::Ready | TuningState::EscalateToUser)
    }
}

/// Terminal READY report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadySummary {
    pub original: SkillDescriptor,
    pub tuned: SkillDescriptor,
    pub final_report: ScoreReport,
    pub changes: Vec<DescriptorChange>,
    pub history: Vec<IterationRecord>,
}

/// Terminal ESCALATE_TO_USER (or cancelled) report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationSummary {
    pub original: SkillDescriptor,
    /// Best-scoring descriptor seen across all rounds, not necessarily the last
    pub best: SkillDescriptor,
    pub best_round: usize,
    pub best_report: ScoreReport,
    pub history: Vec<IterationRecord>,
    pub changes: Vec<DescriptorChange>,
    pub reason: String,
    /// What the caller is asked to provide
    pub guidance_request: String,
}

/// What a tuning session hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionOutcome {
    Ready(ReadySummary),
    EscalateToUser(EscalationSummary),
    /// Stopped by the caller before a new round started
    Cancelled(EscalationSummary),
}

impl SessionOutcome {
    pub fn history(&self) -> &[IterationRecord] {
        match self {
            SessionOutcome::Ready(s) => &s.history,
            SessionOutcome::EscalateToUser(s) | SessionOutcome::Cancelled(s) => &s.history,
        }
    }

    pub fn state(&self) -> TuningState {
        match self {
            SessionOutcome::Ready(_) => TuningState::Ready,
            SessionOutcome::EscalateToUser(_) | SessionOutcome::Cancelled(_) => {
                TuningState::EscalateToUser
            }
        }
    }

    /// Descriptor the caller should keep
    pub fn recommended_descriptor(&self) -> &SkillDescriptor {
        match self {
            SessionOutcome::Ready(s) => &s.tuned,
            SessionOutcome::EscalateToUser(s) | SessionOutcome::Cancelled(s) => &s.best,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Ready(_) => "READY",
            SessionOutcome::EscalateToUser(_) => "ESCALATE_TO_USER",
            SessionOutcome::Cancelled(_) => "CANCELLED",
        }
    }
}
