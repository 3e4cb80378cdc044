//! Error taxonomy shared across the workspace

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuneError {
    /// Requested skill is not registered; fatal to the session
    #[error("skill descriptor '{0}' not found")]
    DescriptorNotFound(String),

    /// A single judge call errored or timed out; recovered per prompt
    #[error("judge call failed for prompt {prompt}: {reason}")]
    JudgeCallFailed { prompt: String, reason: String },

    /// Tuning passes exhausted without reaching READY
    #[error("no READY verdict after {iterations} tuning iterations (best pass rate {best_pass_rate:.1}%)")]
    IterationCapExceeded {
        iterations: usize,
        best_pass_rate: f64,
    },

    /// Prompt set does not hold exactly 10 valid prompts per category
    #[error("malformed prompt set: {0}")]
    MalformedPromptSet(String),

    /// Decisions do not map 1:1 onto the prompt set
    #[error("decision set does not match prompt set: {0}")]
    DecisionMismatch(String),

    /// Session stopped by the caller before any round was scored
    #[error("session cancelled before the first evaluation round completed")]
    Cancelled,

    /// Descriptor failed lint with errors
    #[error("invalid descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TuneError>;
