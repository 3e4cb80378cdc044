use crate::{Category, Confidence, PromptId, TuneError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pass count over a group of prompts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Tally {
    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.correct += 1;
        }
    }

    /// Pass rate in [0, 1]; an empty tally scores 0
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%)",
            self.correct,
            self.total,
            self.ratio() * 100.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Invoked although ground truth says no
    FalsePositive,
    /// Not invoked although ground truth says yes
    FalseNegative,
}

/// Likely cause of a failure, derived from where it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Diagnosis {
    MissingTriggerTerm,
    OverBroadDescription,
    UnderSpecificDescription,
    MissingSymptomBasedTrigger,
}

impl Diagnosis {
    pub fn for_failure(category: Category, kind: FailureKind) -> Self {
        match (category, kind) {
            (Category::MustInvoke, _) => Diagnosis::MissingTriggerTerm,
            (Category::ShouldInvokeEdge, _) => Diagnosis::MissingSymptomBasedTrigger,
            (Category::ShouldNotInvokeEdge, _) => Diagnosis::UnderSpecificDescription,
            (Category::MustNotInvoke, _) => Diagnosis::OverBroadDescription,
        }
    }
}

/// A prompt the judge got wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub prompt_id: PromptId,
    pub prompt: String,
    pub category: Category,
    pub expected: bool,
    pub got: bool,
    pub kind: FailureKind,
    pub confidence: Confidence,
    pub justification: String,
    pub diagnosis: Diagnosis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Ready,
    NeedsTuning,
    MajorIssues,
}

impl Verdict {
    /// Pure function of the overall pass count
    pub fn from_tally(overall: &Tally, thresholds: &VerdictThresholds) -> Self {
        if overall.total == 0 {
            return Verdict::MajorIssues;
        }
        // integer comparison: correct / total >= percent / 100
        let scaled = overall.correct * 100;
        if scaled >= thresholds.ready_percent as usize * overall.total {
            Verdict::Ready
        } else if scaled >= thresholds.tuning_percent as usize * overall.total {
            Verdict::NeedsTuning
        } else {
            Verdict::MajorIssues
        }
    }

    pub fn is_ready(self) -> bool {
        self == Verdict::Ready
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Ready => "READY",
            Verdict::NeedsTuning => "NEEDS_TUNING",
            Verdict::MajorIssues => "MAJOR_ISSUES",
        };
        f.write_str(s)
    }
}

/// Pass-rate cutoffs in whole percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictThresholds {
    /// At or above: READY
    pub ready_percent: u32,
    /// At or above (and below ready): NEEDS_TUNING
    pub tuning_percent: u32,
}

impl VerdictThresholds {
    pub fn new(ready_percent: u32, tuning_percent: u32) -> Result<Self, TuneError> {
        if ready_percent > 100 || tuning_percent > ready_percent {
            return Err(TuneError::Config(format!(
                "invalid verdict thresholds: ready={ready_percent}% tuning={tuning_percent}% \
                 (need tuning <= ready <= 100)"
            )));
        }
        Ok(Self {
            ready_percent,
            tuning_percent,
        })
    }

    /// The 90/70 cutoffs some skill guides use
    pub fn lenient() -> Self {
        Self {
            ready_percent: 90,
            tuning_percent: 70,
        }
    }
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            ready_percent: 95,
            tuning_percent: 85,
        }
    }
}

/// Scored outcome of one evaluation round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub per_category: BTreeMap<Category, Tally>,
    pub overall: Tally,
    pub failures: Vec<Failure>,
    pub verdict: Verdict,
}

impl ScoreReport {
    /// Report for a round that judged nothing
    pub fn empty() -> Self {
        Self {
            per_category: Category::ALL
                .iter()
                .map(|c| (*c, Tally::default()))
                .collect(),
            overall: Tally::default(),
            failures: Vec::new(),
            verdict: Verdict::MajorIssues,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        self.overall.ratio()
    }

    pub fn category(&self, category: Category) -> Tally {
        self.per_category.get(&category).copied().unwrap_or_default()
    }

    pub fn false_positives(&self) -> impl Iterator<Item = &Failure> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::FalsePositive)
    }

    pub fn false_negatives(&self) -> impl Iterator<Item = &Failure> {
        self.failures
            .iter()
            .filter(|f| f.kind == FailureKind::FalseNegative)
    }
}
