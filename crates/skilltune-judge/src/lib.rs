//! Skilltune Judge
//!
//! The [`TextClassifier`] seam and its implementations, plus the [`Matcher`]
//! that wraps a classifier with a timeout and fail-closed semantics.
//!
//! - [`KeywordClassifier`]: deterministic lexical matching, the default judge
//! - [`LlmClassifier`]: chat-model judge over an OpenAI-compatible API

pub mod classifier;
pub mod keyword;
pub mod llm;
pub mod matcher;
pub mod terms;

pub use classifier::{JudgeError, Result, TextClassifier};
pub use keyword::KeywordClassifier;
pub use llm::{JudgeProvider, LlmClassifier};
pub use matcher::{Matcher, DEFAULT_JUDGE_TIMEOUT};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{KeywordClassifier, Matcher, TextClassifier};
}
