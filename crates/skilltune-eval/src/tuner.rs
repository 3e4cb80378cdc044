//! Descriptor tuner: maps each failure to a fix pattern and rewrites the
//! description accordingly
//!
//! A term only moves the description toward one label when no prompt of
//! the opposite label uses it. Otherwise an exclusion taken from a generic
//! word would veto the very requests the skill exists for. Terms that would
//! push the description past [`MAX_DESCRIPTION_LENGTH`] are dropped.

use skilltune_judge::terms::{extract_terms, TriggerProfile};
use skilltune_skills::lint::MAX_DESCRIPTION_LENGTH;
use skilltune_types::{
    DescriptorChange, Failure, FixPattern, ScoreReport, SkillDescriptor,
};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::corpus::PromptSet;

/// Upper bound on terms taken from a single failing prompt
pub const MAX_TERMS_PER_CHANGE: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorTuner;

impl DescriptorTuner {
    pub fn new() -> Self {
        Self
    }

    /// Apply one tuning pass over every failure in `report`.
    ///
    /// Only the description changes. Failures are handled in prompt order,
    /// each against the description left by the previous one. `prompts` is
    /// the set the report was scored on.
    pub fn propose(
        &self,
        descriptor: &SkillDescriptor,
        report: &ScoreReport,
        prompts: &PromptSet,
        iteration: usize,
    ) -> (SkillDescriptor, Vec<DescriptorChange>) {
        let mut current = descriptor.clone();
        let mut changes = Vec::with_capacity(report.failures.len());
        let positive = prompts.stems_labeled(true);
        let negative = prompts.stems_labeled(false);

        for failure in &report.failures {
            let Some(pattern) = FixPattern::for_failure(failure.category, failure.kind) else {
                debug!(
                    prompt = %failure.prompt_id,
                    "No fix pattern for {:?} in {}",
                    failure.kind,
                    failure.category
                );
                continue;
            };

            let opposite = if widens(pattern) { &negative } else { &positive };
            let mut terms = new_terms(&current, failure, pattern, opposite);
            let before = current.description.clone();
            let mut after = before.clone();
            while !terms.is_empty() {
                let candidate = append_clause(&before, clause_prefix(pattern), &terms);
                if candidate.len() <= MAX_DESCRIPTION_LENGTH {
                    after = candidate;
                    break;
                }
                terms.pop();
            }
            if after == before {
                debug!(prompt = %failure.prompt_id, "No room or no new terms for {:?}", pattern);
            }
            current = current.with_description(after.clone());

            changes.push(DescriptorChange {
                iteration,
                prompt_id: failure.prompt_id,
                pattern,
                terms,
                before,
                after,
            });
        }

        info!(
            "Tuning pass {} for '{}': {} failures, {} text changes",
            iteration,
            descriptor.name,
            report.failures.len(),
            changes.iter().filter(|c| c.changed_text()).count()
        );
        (current, changes)
    }
}

fn clause_prefix(pattern: FixPattern) -> &'static str {
    match pattern {
        FixPattern::AddTriggerTerms => "Use when the request mentions",
        FixPattern::BroadenPhrasing => "Also covers related phrasing such as",
        FixPattern::AddNarrowingContext => {
            "Ask for clarification instead when the request is about"
        }
        FixPattern::AddExclusion => "Do not use for",
    }
}

fn widens(pattern: FixPattern) -> bool {
    matches!(
        pattern,
        FixPattern::AddTriggerTerms | FixPattern::BroadenPhrasing
    )
}

/// Content words of the failing prompt the description does not already
/// treat the way the fix needs, minus stems in `opposite`
fn new_terms(
    descriptor: &SkillDescriptor,
    failure: &Failure,
    pattern: FixPattern,
    opposite: &HashSet<String>,
) -> Vec<String> {
    let profile = TriggerProfile::from_descriptor(descriptor);
    let widening = widens(pattern);

    extract_terms(&failure.prompt)
        .into_iter()
        .filter(|t| !opposite.contains(&t.stem))
        .filter(|t| {
            if widening {
                !profile.is_trigger(&t.stem)
            } else {
                !profile.is_trigger(&t.stem) && !profile.is_exclusion(&t.stem)
            }
        })
        .take(MAX_TERMS_PER_CHANGE)
        .map(|t| t.surface)
        .collect()
}

/// Extend the sentence starting with `prefix`, or append a new one
fn append_clause(description: &str, prefix: &str, terms: &[String]) -> String {
    let list = terms.join(", ");

    if let Some(start) = description.find(prefix) {
        let tail = &description[start..];
        let end = tail.find('.').map(|i| start + i).unwrap_or(description.len());
        return format!("{}, {}{}", &description[..end], list, &description[end..]);
    }

    let body = description.trim_end();
    if body.is_empty() {
        return format!("{prefix} {list}.");
    }
    let separator = if body.ends_with(['.', '!', '?']) { " " } else { ". " };
    format!("{body}{separator}{prefix} {list}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusGenerator;
    use skilltune_judge::KeywordClassifier;
    use skilltune_types::{
        Category, Confidence, Diagnosis, FailureKind, PromptId, SeedFailure, Tally, Verdict,
    };
    use std::collections::BTreeMap;

    fn tweet_writer() -> SkillDescriptor {
        SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets.",
        )
    }

    fn prompts() -> PromptSet {
        CorpusGenerator::new().generate(&tweet_writer(), None).unwrap()
    }

    fn failure(id: usize, prompt: &str, category: Category) -> Failure {
        let expected = category.ground_truth();
        let kind = if expected {
            FailureKind::FalseNegative
        } else {
            FailureKind::FalsePositive
        };
        Failure {
            prompt_id: PromptId(id),
            prompt: prompt.to_string(),
            category,
            expected,
            got: !expected,
            kind,
            confidence: Confidence::Low,
            justification: "stub".into(),
            diagnosis: Diagnosis::for_failure(category, kind),
        }
    }

    fn report(failures: Vec<Failure>) -> ScoreReport {
        let overall = Tally {
            correct: 40 - failures.len(),
            total: 40,
        };
        ScoreReport {
            per_category: BTreeMap::new(),
            overall,
            failures,
            verdict: Verdict::NeedsTuning,
        }
    }

    #[test]
    fn test_must_invoke_miss_adds_trigger_terms() {
        let report = report(vec![failure(0, "schedule my linkedin update", Category::MustInvoke)]);
        let (tuned, changes) =
            DescriptorTuner::new().propose(&tweet_writer(), &report, &prompts(), 1);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].pattern, FixPattern::AddTriggerTerms);
        assert_eq!(changes[0].iteration, 1);
        assert_eq!(changes[0].terms, vec!["schedule", "linkedin", "update"]);
        assert!(tuned
            .description
            .ends_with("Use when the request mentions schedule, linkedin, update."));
        assert_eq!(tuned.name, "tweet-writer");
    }

    #[test]
    fn test_must_not_invoke_hit_adds_exclusion() {
        let report = report(vec![failure(
            39,
            "write a blog post about productivity",
            Category::MustNotInvoke,
        )]);
        let (tuned, changes) =
            DescriptorTuner::new().propose(&tweet_writer(), &report, &prompts(), 2);

        assert_eq!(changes[0].pattern, FixPattern::AddExclusion);
        // "post" is already a trigger and is never excluded
        assert_eq!(changes[0].terms, vec!["blog", "productivity"]);
        assert!(tuned.description.ends_with("Do not use for blog, productivity."));
        assert!(TriggerProfile::from_descriptor(&tuned).is_exclusion("blog"));
    }

    #[test]
    fn test_exclusion_skips_words_of_positive_prompts() {
        let seed = SeedFailure::new("draft a thread on productivity tips", true);
        let prompts = CorpusGenerator::new()
            .generate(&tweet_writer(), Some(&seed))
            .unwrap();
        let report = report(vec![failure(
            39,
            "write a blog post about productivity",
            Category::MustNotInvoke,
        )]);
        let (tuned, changes) =
            DescriptorTuner::new().propose(&tweet_writer(), &report, &prompts, 1);

        assert_eq!(changes[0].terms, vec!["blog"]);
        assert!(tuned.description.ends_with("Do not use for blog."));

        let thread = KeywordClassifier::new().judge(&seed.text, &tuned).unwrap();
        assert!(thread.invoked, "{}", thread.justification);
    }

    #[test]
    fn test_widening_skips_words_of_negative_prompts() {
        // "Compare engaging with the alternatives before I decide" is a generated negative
        let report = report(vec![failure(3, "compare linkedin hooks", Category::MustInvoke)]);
        let (_, changes) = DescriptorTuner::new().propose(&tweet_writer(), &report, &prompts(), 1);
        assert_eq!(changes[0].terms, vec!["linkedin", "hooks"]);
    }

    #[test]
    fn test_existing_clause_is_extended() {
        let descriptor = SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts. Do not use for blog posts. Keep it short.",
        );
        let report = report(vec![failure(30, "plan a newsletter", Category::MustNotInvoke)]);
        let (tuned, _) = DescriptorTuner::new().propose(&descriptor, &report, &prompts(), 1);

        assert_eq!(
            tuned.description,
            "Helps write engaging Twitter/X posts. Do not use for blog posts, plan, newsletter. Keep it short."
        );
    }

    #[test]
    fn test_edge_failures_use_edge_patterns() {
        let report = report(vec![
            failure(10, "my announcement needs punch", Category::ShouldInvokeEdge),
            failure(20, "compare tweets with alternatives", Category::ShouldNotInvokeEdge),
        ]);
        let (tuned, changes) =
            DescriptorTuner::new().propose(&tweet_writer(), &report, &prompts(), 1);

        assert_eq!(changes[0].pattern, FixPattern::BroadenPhrasing);
        assert_eq!(changes[1].pattern, FixPattern::AddNarrowingContext);
        assert_eq!(changes[1].terms, vec!["compare", "alternatives"]);
        assert!(tuned
            .description
            .contains("Also covers related phrasing such as announcement, punch."));
        assert!(tuned.description.ends_with(
            "Ask for clarification instead when the request is about compare, alternatives."
        ));
        // changes chain: each starts from the previous result
        assert_eq!(changes[1].before, changes[0].after);
    }

    #[test]
    fn test_no_new_terms_records_unchanged_pattern() {
        let report = report(vec![failure(1, "draft tweets", Category::MustInvoke)]);
        let (tuned, changes) =
            DescriptorTuner::new().propose(&tweet_writer(), &report, &prompts(), 3);

        assert_eq!(changes.len(), 1);
        assert!(changes[0].terms.is_empty());
        assert!(!changes[0].changed_text());
        assert_eq!(tuned, tweet_writer());
    }

    #[test]
    fn test_terms_past_the_length_limit_are_dropped() {
        let base = "Helps write engaging Twitter/X posts.";
        let filler = "x".repeat(979 - base.len() - 2);
        let descriptor = SkillDescriptor::new("tweet-writer", format!("{base} {filler}."));
        assert_eq!(descriptor.description.len(), 979);

        let first = report(vec![failure(0, "schedule my linkedin update", Category::MustInvoke)]);
        let (tuned, changes) = DescriptorTuner::new().propose(&descriptor, &first, &prompts(), 1);

        assert_eq!(changes[0].terms, vec!["schedule"]);
        assert_eq!(tuned.description.len(), 1019);
        assert!(tuned
            .description
            .ends_with("Use when the request mentions schedule."));

        let second = report(vec![failure(1, "plan a linkedin update", Category::MustInvoke)]);
        let (again, changes) = DescriptorTuner::new().propose(&tuned, &second, &prompts(), 2);
        assert!(changes[0].terms.is_empty());
        assert_eq!(again, tuned);
    }

    #[test]
    fn test_append_clause_punctuation() {
        assert_eq!(
            append_clause("Writes tweets", "Do not use for", &["blog".into()]),
            "Writes tweets. Do not use for blog."
        );
        assert_eq!(
            append_clause("", "Do not use for", &["blog".into()]),
            "Do not use for blog."
        );
    }
}
