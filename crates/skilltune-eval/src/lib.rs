//! Skilltune Eval - Blind evaluation and descriptor tuning
//!
//! - [`CorpusGenerator`] builds the fixed 40-prompt [`PromptSet`]
//! - [`BlindEvaluator`] fans the prompts out to the judge concurrently
//! - [`Scorer`] compares decisions with the hidden labels
//! - [`DescriptorTuner`] rewrites the description per failure
//! - [`TuningSession`] runs the loop until READY or escalation

pub mod corpus;
pub mod evaluator;
pub mod scorer;
pub mod session;
pub mod tuner;

pub use corpus::{CorpusGenerator, PromptSet};
pub use evaluator::{BlindEvaluator, DEFAULT_MAX_CONCURRENCY};
pub use scorer::Scorer;
pub use session::{TuningConfig, TuningSession, MAX_TUNING_ITERATIONS};
pub use tuner::DescriptorTuner;

pub mod prelude {
    pub use crate::{BlindEvaluator, CorpusGenerator, PromptSet, TuningConfig, TuningSession};
}
