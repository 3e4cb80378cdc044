use serde::{Deserialize, Serialize};
use std::fmt;

/// Prompts per category in every evaluation round
pub const PROMPTS_PER_CATEGORY: usize = 10;

/// Total prompts in a session's fixed set
pub const PROMPT_SET_SIZE: usize = PROMPTS_PER_CATEGORY * 4;

/// Position of a prompt inside its session's prompt set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptId(pub usize);

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{:02}", self.0)
    }
}

/// Test prompt bucket. Never shown to the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    MustInvoke,
    ShouldInvokeEdge,
    ShouldNotInvokeEdge,
    MustNotInvoke,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::MustInvoke,
        Category::ShouldInvokeEdge,
        Category::ShouldNotInvokeEdge,
        Category::MustNotInvoke,
    ];

    /// Whether prompts in this bucket should trigger the skill
    pub fn ground_truth(self) -> bool {
        matches!(self, Category::MustInvoke | Category::ShouldInvokeEdge)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::MustInvoke => "MUST_INVOKE",
            Category::ShouldInvokeEdge => "SHOULD_INVOKE_EDGE",
            Category::ShouldNotInvokeEdge => "SHOULD_NOT_INVOKE_EDGE",
            Category::MustNotInvoke => "MUST_NOT_INVOKE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A labeled test prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
    pub category: Category,
    pub ground_truth: bool,
}

impl Prompt {
    /// Ground truth follows from the category
    pub fn new(id: PromptId, text: impl Into<String>, category: Category) -> Self {
        Self {
            id,
            text: text.into(),
            category,
            ground_truth: category.ground_truth(),
        }
    }

    /// The part of the prompt the judge is allowed to see
    pub fn blind(&self) -> BlindPrompt {
        BlindPrompt {
            id: self.id,
            text: self.text.clone(),
        }
    }
}

/// Prompt as seen by the judge: id and text only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindPrompt {
    pub id: PromptId,
    pub text: String,
}

/// A previously observed misfire used to seed the edge buckets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    pub text: String,
    /// Desired outcome: true if the skill should have been invoked
    pub expected: bool,
}

impl SeedFailure {
    pub fn new(text: impl Into<String>, expected: bool) -> Self {
        Self {
            text: text.into(),
            expected,
        }
    }

    /// Bucket the seed belongs to. Never one of the MUST buckets.
    pub fn category(&self) -> Category {
        if self.expected {
            Category::ShouldInvokeEdge
        } else {
            Category::ShouldNotInvokeEdge
        }
    }
}
