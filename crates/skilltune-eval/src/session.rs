//! Tuning session: generate once, then evaluate, score and tune until READY
//! or the iteration cap

use skilltune_skills::DescriptorStore;
use skilltune_types::{
    DescriptorChange, EscalationSummary, IterationRecord, ReadySummary, Result, ScoreReport,
    SeedFailure, SessionOutcome, SkillDescriptor, TuneError, TuningState, VerdictThresholds,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::corpus::{CorpusGenerator, PromptSet};
use crate::evaluator::BlindEvaluator;
use crate::scorer::Scorer;
use crate::tuner::DescriptorTuner;

/// Hard cap on tuning passes per session
pub const MAX_TUNING_ITERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningConfig {
    pub max_iterations: usize,
    pub thresholds: VerdictThresholds,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_TUNING_ITERATIONS,
            thresholds: VerdictThresholds::default(),
        }
    }
}

/// Drives one skill through GENERATING, EVALUATING, SCORING and TUNING.
///
/// The store is the only shared state. The session is its single writer and
/// only updates it between evaluation rounds.
pub struct TuningSession {
    store: Arc<DescriptorStore>,
    evaluator: BlindEvaluator,
    generator: CorpusGenerator,
    scorer: Scorer,
    tuner: DescriptorTuner,
    max_iterations: usize,
    prompts: Option<PromptSet>,
    cancel: CancellationToken,
}

impl TuningSession {
    pub fn new(store: Arc<DescriptorStore>, evaluator: BlindEvaluator, config: TuningConfig) -> Self {
        Self {
            store,
            evaluator,
            generator: CorpusGenerator::new(),
            scorer: Scorer::new(config.thresholds),
            tuner: DescriptorTuner::new(),
            max_iterations: config.max_iterations,
            prompts: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Evaluate against a hand-written set instead of generating one
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the session before its next round
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The fixed prompt set for a session on `descriptor`
    pub fn prompt_set(
        &self,
        descriptor: &SkillDescriptor,
        seed: Option<&SeedFailure>,
    ) -> Result<PromptSet> {
        enter(&descriptor.name, TuningState::Generating);
        match &self.prompts {
            Some(prompts) => Ok(prompts.clone()),
            None => self.generator.generate(descriptor, seed),
        }
    }

    /// A single blind round without tuning
    pub async fn evaluate_once(
        &self,
        skill: &str,
        seed: Option<&SeedFailure>,
    ) -> Result<(PromptSet, ScoreReport)> {
        let descriptor = self.store.get(skill).await?;
        let prompts = self.prompt_set(&descriptor, seed)?;
        let report = self.round(&prompts, Arc::clone(&descriptor)).await?;
        Ok((prompts, report))
    }

    /// Run the full tuning loop for `skill`.
    ///
    /// Structural problems (unknown skill, malformed prompt set) are errors.
    /// Not reaching READY within the cap is an `EscalateToUser` outcome.
    pub async fn run(&self, skill: &str, seed: Option<&SeedFailure>) -> Result<SessionOutcome> {
        let original = self.store.get(skill).await?;
        let prompts = self.prompt_set(&original, seed)?;
        info!(
            "Tuning '{}' with {} prompts via {} judge",
            skill,
            prompts.len(),
            self.evaluator.matcher().classifier_name()
        );

        let mut current = Arc::clone(&original);
        let mut history: Vec<IterationRecord> = Vec::new();
        let mut changes: Vec<DescriptorChange> = Vec::new();
        let mut iteration = 0;

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(&original, history, changes).await;
            }

            let report = self.round(&prompts, Arc::clone(&current)).await?;
            info!(
                "Round {} for '{}': {} -> {}",
                iteration, skill, report.overall, report.verdict
            );
            history.push(IterationRecord::new(
                iteration,
                current.as_ref().clone(),
                report.clone(),
            ));

            if report.verdict.is_ready() {
                enter(skill, TuningState::Ready);
                return Ok(SessionOutcome::Ready(ReadySummary {
                    original: original.as_ref().clone(),
                    tuned: current.as_ref().clone(),
                    final_report: report,
                    changes,
                    history,
                }));
            }

            if iteration >= self.max_iterations {
                enter(skill, TuningState::EscalateToUser);
                let summary = escalation(&original, history, changes, |best| {
                    TuneError::IterationCapExceeded {
                        iterations: iteration,
                        best_pass_rate: best.pass_rate() * 100.0,
                    }
                    .to_string()
                });
                warn!("{}", summary.reason);
                self.restore_best(&summary).await?;
                return Ok(SessionOutcome::EscalateToUser(summary));
            }

            enter(skill, TuningState::Tuning);
            iteration += 1;
            let (tuned, pass_changes) =
                self.tuner.propose(&current, &report, &prompts, iteration);
            changes.extend(pass_changes);
            current = self.store.update(skill, tuned.description).await?;
        }
    }

    async fn round(
        &self,
        prompts: &PromptSet,
        descriptor: Arc<SkillDescriptor>,
    ) -> Result<ScoreReport> {
        enter(&descriptor.name, TuningState::Evaluating);
        let decisions = self.evaluator.run_all(prompts.prompts(), Arc::clone(&descriptor)).await;
        enter(&descriptor.name, TuningState::Scoring);
        self.scorer.score(&decisions, prompts)
    }

    async fn cancelled(
        &self,
        original: &SkillDescriptor,
        history: Vec<IterationRecord>,
        changes: Vec<DescriptorChange>,
    ) -> Result<SessionOutcome> {
        if history.is_empty() {
            return Err(TuneError::Cancelled);
        }
        let rounds = history.len();
        let summary = escalation(original, history, changes, |_| {
            format!("session cancelled after {rounds} evaluation round(s)")
        });
        info!("{}", summary.reason);
        self.restore_best(&summary).await?;
        Ok(SessionOutcome::Cancelled(summary))
    }

    /// Leave the best-scoring description in the store
    async fn restore_best(&self, summary: &EscalationSummary) -> Result<()> {
        let stored = self.store.get(&summary.best.name).await?;
        if stored.description != summary.best.description {
            self.store
                .update(&summary.best.name, summary.best.description.clone())
                .await?;
            debug!(
                "Restored round {} description of '{}'",
                summary.best_round, summary.best.name
            );
        }
        Ok(())
    }
}

fn enter(skill: &str, state: TuningState) {
    debug!(skill, ?state, "entering state");
}

/// Build an escalation summary around the best round: highest pass count,
/// earliest round on ties
fn escalation(
    original: &SkillDescriptor,
    history: Vec<IterationRecord>,
    changes: Vec<DescriptorChange>,
    reason: impl FnOnce(&ScoreReport) -> String,
) -> EscalationSummary {
    let best = history
        .iter()
        .fold(None::<&IterationRecord>, |best, record| match best {
            Some(b) if b.report.overall.correct >= record.report.overall.correct => Some(b),
            _ => Some(record),
        });

    let (best, best_round, best_report) = match best {
        Some(record) => (
            record.descriptor.clone(),
            record.round,
            record.report.clone(),
        ),
        None => (original.clone(), 0, ScoreReport::empty()),
    };

    let reason = reason(&best_report);
    let guidance_request = format!(
        "Best result was round {} at {}. Review its {} failing prompt(s) and supply a revised \
         description or a real misfiring prompt to seed the next session.",
        best_round,
        best_report.overall,
        best_report.failures.len()
    );

    EscalationSummary {
        original: original.clone(),
        best,
        best_round,
        best_report,
        history,
        changes,
        reason,
        guidance_request,
    }
}
