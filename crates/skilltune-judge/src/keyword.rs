//! Deterministic lexical judge
//!
//! Weighs the trigger terms of a descriptor that appear in the request. A
//! name segment counts as two pieces of evidence, any other trigger as one,
//! and at least two are needed to invoke. Exclusion language vetoes a match
//! unless two or more distinct trigger terms say otherwise.

use async_trait::async_trait;
use skilltune_types::{Confidence, Judgement, SkillDescriptor};

use crate::classifier::{JudgeError, Result, TextClassifier};
use crate::terms::{extract_terms, TriggerProfile};

/// Evidence needed before a request invokes the skill
pub const INVOKE_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`TextClassifier::classify`]
    pub fn judge(&self, prompt_text: &str, descriptor: &SkillDescriptor) -> Result<Judgement> {
        let prompt_terms = extract_terms(prompt_text);
        if prompt_terms.is_empty() {
            return Err(JudgeError::Undecidable(
                "request has no content words to match".to_string(),
            ));
        }

        let profile = TriggerProfile::from_descriptor(descriptor);

        let matched: Vec<&str> = prompt_terms
            .iter()
            .filter(|t| profile.is_trigger(&t.stem))
            .map(|t| t.surface.as_str())
            .collect();
        let evidence: usize = prompt_terms.iter().map(|t| profile.weight(&t.stem)).sum();

        let excluded: Vec<&str> = prompt_terms
            .iter()
            .filter(|t| profile.is_exclusion(&t.stem))
            .map(|t| t.surface.as_str())
            .collect();
        if !excluded.is_empty() && matched.len() < 2 {
            return Ok(Judgement::no_invoke(
                Confidence::High,
                format!(
                    "description of '{}' excludes: {}",
                    descriptor.name,
                    excluded.join(", ")
                ),
            ));
        }

        if matched.is_empty() {
            return Ok(Judgement::no_invoke(
                Confidence::High,
                format!(
                    "no trigger terms of '{}' appear in the request",
                    descriptor.name
                ),
            ));
        }

        if evidence < INVOKE_THRESHOLD {
            return Ok(Judgement::no_invoke(
                Confidence::Low,
                format!(
                    "only a single weak trigger term ({}) matched, too ambiguous to invoke",
                    matched.join(", ")
                ),
            ));
        }

        if !excluded.is_empty() {
            return Ok(Judgement::invoke(
                Confidence::Low,
                format!(
                    "matched trigger terms: {} (despite excluded: {})",
                    matched.join(", "),
                    excluded.join(", ")
                ),
            ));
        }

        let confidence = if evidence >= 4 {
            Confidence::High
        } else {
            Confidence::Medium
        };
        Ok(Judgement::invoke(
            confidence,
            format!("matched trigger terms: {}", matched.join(", ")),
        ))
    }
}

#[async_trait]
impl TextClassifier for KeywordClassifier {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn classify(&self, prompt_text: &str, descriptor: &SkillDescriptor) -> Result<Judgement> {
        self.judge(prompt_text, descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet_writer() -> SkillDescriptor {
        SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets. \
             Do not use for blog posts or long-form articles.",
        )
    }

    /// The bare one-line description a skill author usually starts from
    fn terse_tweet_writer() -> SkillDescriptor {
        SkillDescriptor::new("tweet-writer", "Helps write engaging Twitter/X posts...")
    }

    #[test]
    fn test_thread_request_invokes() {
        let judgement = KeywordClassifier::new()
            .judge("draft a thread on productivity tips", &tweet_writer())
            .unwrap();
        assert!(judgement.invoked);
        assert_eq!(judgement.confidence, Confidence::Medium);
        assert!(judgement.justification.contains("draft"));
        assert!(judgement.justification.contains("thread"));
    }

    #[test]
    fn test_blog_request_does_not_invoke() {
        let judgement = KeywordClassifier::new()
            .judge("write a blog post about productivity", &tweet_writer())
            .unwrap();
        assert!(!judgement.invoked);
        assert!(judgement.justification.contains("blog"));
    }

    #[test]
    fn test_terse_description_separates_thread_from_blog() {
        let classifier = KeywordClassifier::new();

        let thread = classifier
            .judge("draft a thread on productivity tips", &terse_tweet_writer())
            .unwrap();
        assert!(thread.invoked, "{}", thread.justification);
        assert_eq!(thread.confidence, Confidence::Medium);

        let blog = classifier
            .judge("write a blog post about productivity", &terse_tweet_writer())
            .unwrap();
        assert!(!blog.invoked, "{}", blog.justification);
        assert_eq!(blog.confidence, Confidence::Low);
        assert!(blog.justification.contains("post"));
    }

    #[test]
    fn test_single_weak_term_fails_closed() {
        let judgement = KeywordClassifier::new()
            .judge("a catchy thread", &tweet_writer())
            .unwrap();
        assert!(!judgement.invoked);
        assert_eq!(judgement.confidence, Confidence::Low);
        assert!(judgement.justification.contains("ambiguous"));
    }

    #[test]
    fn test_name_segment_alone_invokes() {
        let judgement = KeywordClassifier::new()
            .judge("ok so tweet stuff", &terse_tweet_writer())
            .unwrap();
        assert!(judgement.invoked);
        assert_eq!(judgement.confidence, Confidence::Medium);
    }

    #[test]
    fn test_exclusion_does_not_override_two_triggers() {
        let descriptor = SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts... Do not use for blog, productivity.",
        );
        let classifier = KeywordClassifier::new();

        let thread = classifier
            .judge("draft a thread on productivity tips", &descriptor)
            .unwrap();
        assert!(thread.invoked, "{}", thread.justification);
        assert_eq!(thread.confidence, Confidence::Low);
        assert!(thread.justification.contains("productivity"));

        let vetoed = classifier
            .judge("productivity thread", &descriptor)
            .unwrap();
        assert!(!vetoed.invoked);
        assert_eq!(vetoed.confidence, Confidence::High);
    }

    #[test]
    fn test_unrelated_request_does_not_invoke() {
        let judgement = KeywordClassifier::new()
            .judge("what is the capital of Peru", &tweet_writer())
            .unwrap();
        assert!(!judgement.invoked);
        assert_eq!(judgement.confidence, Confidence::High);
        assert!(judgement.justification.contains("no trigger terms"));
    }

    #[test]
    fn test_confidence_grows_with_evidence() {
        let classifier = KeywordClassifier::new();
        let two = classifier.judge("draft a thread", &tweet_writer()).unwrap();
        let many = classifier
            .judge("draft engaging tweets as a thread", &tweet_writer())
            .unwrap();
        assert_eq!(two.confidence, Confidence::Medium);
        assert_eq!(many.confidence, Confidence::High);
    }

    #[test]
    fn test_filler_only_is_undecidable() {
        let err = KeywordClassifier::new()
            .judge("can you help me?", &tweet_writer())
            .unwrap_err();
        assert!(matches!(err, JudgeError::Undecidable(_)));
    }
}
