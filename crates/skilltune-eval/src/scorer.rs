//! Scorer: compares blind decisions with the label side table

use skilltune_types::{
    Category, Decision, Diagnosis, Failure, FailureKind, PromptId, Result, ScoreReport, Tally,
    TuneError, Verdict, VerdictThresholds,
};
use std::collections::{BTreeMap, HashMap};

use crate::corpus::PromptSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    thresholds: VerdictThresholds,
}

impl Scorer {
    pub fn new(thresholds: VerdictThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> VerdictThresholds {
        self.thresholds
    }

    /// Score one round. Decisions must cover every prompt exactly once.
    pub fn score(&self, decisions: &[Decision], prompt_set: &PromptSet) -> Result<ScoreReport> {
        if decisions.len() != prompt_set.len() {
            return Err(TuneError::DecisionMismatch(format!(
                "{} decisions for {} prompts",
                decisions.len(),
                prompt_set.len()
            )));
        }

        let mut by_id: HashMap<PromptId, &Decision> = HashMap::with_capacity(decisions.len());
        for decision in decisions {
            if by_id.insert(decision.prompt_id, decision).is_some() {
                return Err(TuneError::DecisionMismatch(format!(
                    "duplicate decision for {}",
                    decision.prompt_id
                )));
            }
        }

        let mut per_category: BTreeMap<Category, Tally> =
            Category::ALL.iter().map(|c| (*c, Tally::default())).collect();
        let mut overall = Tally::default();
        let mut failures = Vec::new();

        for prompt in prompt_set.prompts() {
            let label = prompt_set.label(prompt.id).ok_or_else(|| {
                TuneError::DecisionMismatch(format!("prompt {} has no label", prompt.id))
            })?;
            let decision = by_id.get(&prompt.id).ok_or_else(|| {
                TuneError::DecisionMismatch(format!("no decision for {}", prompt.id))
            })?;

            let passed = decision.invoked == label.ground_truth;
            overall.record(passed);
            per_category.entry(label.category).or_default().record(passed);

            if !passed {
                let kind = if decision.invoked {
                    FailureKind::FalsePositive
                } else {
                    FailureKind::FalseNegative
                };
                failures.push(Failure {
                    prompt_id: prompt.id,
                    prompt: prompt.text.clone(),
                    category: label.category,
                    expected: label.ground_truth,
                    got: decision.invoked,
                    kind,
                    confidence: decision.confidence,
                    justification: decision.justification.clone(),
                    diagnosis: Diagnosis::for_failure(label.category, kind),
                });
            }
        }

        Ok(ScoreReport {
            per_category,
            overall,
            failures,
            verdict: Verdict::from_tally(&overall, &self.thresholds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusGenerator;
    use skilltune_types::{Confidence, SkillDescriptor};

    fn prompt_set() -> PromptSet {
        CorpusGenerator::new()
            .generate(
                &SkillDescriptor::new("tweet-writer", "Helps write engaging Twitter/X posts."),
                None,
            )
            .unwrap()
    }

    /// Correct decisions for every prompt except the first `wrong` ones
    fn decisions(set: &PromptSet, wrong: usize) -> Vec<Decision> {
        set.to_labeled()
            .iter()
            .enumerate()
            .map(|(i, p)| Decision {
                prompt_id: p.id,
                invoked: if i < wrong { !p.ground_truth } else { p.ground_truth },
                confidence: Confidence::High,
                justification: "stub".into(),
                forced: false,
            })
            .collect()
    }

    #[test]
    fn test_perfect_round_is_ready() {
        let set = prompt_set();
        let report = Scorer::default().score(&decisions(&set, 0), &set).unwrap();
        assert_eq!(report.overall, Tally { correct: 40, total: 40 });
        assert_eq!(report.verdict, Verdict::Ready);
        assert!(report.failures.is_empty());
        for category in Category::ALL {
            assert_eq!(report.category(category).total, 10);
        }
    }

    #[test]
    fn test_verdict_boundaries_through_scorer() {
        let set = prompt_set();
        let scorer = Scorer::default();
        assert_eq!(scorer.score(&decisions(&set, 2), &set).unwrap().verdict, Verdict::Ready);
        assert_eq!(
            scorer.score(&decisions(&set, 3), &set).unwrap().verdict,
            Verdict::NeedsTuning
        );
        assert_eq!(
            scorer.score(&decisions(&set, 7), &set).unwrap().verdict,
            Verdict::MajorIssues
        );
    }

    #[test]
    fn test_failures_are_classified() {
        let set = prompt_set();
        let labeled = set.to_labeled();
        let mut decisions = decisions(&set, 0);
        // first MUST_INVOKE prompt missed, last MUST_NOT_INVOKE prompt fired
        decisions[0].invoked = false;
        decisions[39].invoked = true;

        let report = Scorer::default().score(&decisions, &set).unwrap();

        assert_eq!(report.failures.len(), 2);
        let missed = &report.failures[0];
        assert_eq!(missed.category, labeled[0].category);
        assert_eq!(missed.kind, FailureKind::FalseNegative);
        assert_eq!(missed.diagnosis, Diagnosis::MissingTriggerTerm);
        let fired = &report.failures[1];
        assert_eq!(fired.category, Category::MustNotInvoke);
        assert_eq!(fired.kind, FailureKind::FalsePositive);
        assert_eq!(fired.diagnosis, Diagnosis::OverBroadDescription);
        assert_eq!(report.false_negatives().count(), 1);
        assert_eq!(report.false_positives().count(), 1);
        assert_eq!(report.category(Category::MustInvoke).correct, 9);
    }

    #[test]
    fn test_rescoring_is_idempotent() {
        let set = prompt_set();
        let decisions = decisions(&set, 5);
        let scorer = Scorer::default();
        let first = scorer.score(&decisions, &set).unwrap();
        let second = scorer.score(&decisions, &set).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decision_order_does_not_matter() {
        let set = prompt_set();
        let decisions = decisions(&set, 4);
        let mut reversed = decisions.clone();
        reversed.reverse();
        let scorer = Scorer::default();
        assert_eq!(
            scorer.score(&decisions, &set).unwrap(),
            scorer.score(&reversed, &set).unwrap()
        );
    }

    #[test]
    fn test_missing_decision_is_mismatch() {
        let set = prompt_set();
        let mut decisions = decisions(&set, 0);
        decisions.pop();
        assert!(matches!(
            Scorer::default().score(&decisions, &set),
            Err(TuneError::DecisionMismatch(_))
        ));
    }

    #[test]
    fn test_duplicate_decision_is_mismatch() {
        let set = prompt_set();
        let mut decisions = decisions(&set, 0);
        decisions[1].prompt_id = decisions[0].prompt_id;
        assert!(matches!(
            Scorer::default().score(&decisions, &set),
            Err(TuneError::DecisionMismatch(_))
        ));
    }

    #[test]
    fn test_lenient_thresholds() {
        let set = prompt_set();
        let report = Scorer::new(VerdictThresholds::lenient())
            .score(&decisions(&set, 4), &set)
            .unwrap();
        assert_eq!(report.verdict, Verdict::Ready);
    }
}
