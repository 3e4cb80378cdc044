//! Matcher: one blind judgement per prompt, failing closed

use skilltune_types::{BlindPrompt, Decision, SkillDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::classifier::{JudgeError, TextClassifier};

/// Default per-call judge timeout
pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Wraps a classifier and turns every failure into NO_INVOKE / LOW.
///
/// Cheap to clone; clones share the classifier.
#[derive(Clone)]
pub struct Matcher {
    classifier: Arc<dyn TextClassifier>,
    timeout: Duration,
}

impl Matcher {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            classifier,
            timeout: DEFAULT_JUDGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Decide for a single prompt. Only the prompt's id and text are available here.
    pub async fn decide(&self, prompt: &BlindPrompt, descriptor: &SkillDescriptor) -> Decision {
        let call = self.classifier.classify(&prompt.text, descriptor);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(JudgeError::Timeout(self.timeout)),
        };

        match result {
            Ok(judgement) => {
                debug!(
                    prompt = %prompt.id,
                    invoked = judgement.invoked,
                    confidence = %judgement.confidence,
                    "judge decided"
                );
                Decision::from_judgement(prompt.id, judgement)
            }
            Err(e) => {
                let decision = Decision::forced_no_invoke(prompt.id, e);
                warn!("{}; recording NO_INVOKE", decision.justification);
                decision
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::KeywordClassifier;
    use async_trait::async_trait;
    use skilltune_types::{Confidence, Judgement, PromptId};

    struct FailingClassifier;

    #[async_trait]
    impl TextClassifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify(
            &self,
            _prompt_text: &str,
            _descriptor: &SkillDescriptor,
        ) -> crate::Result<Judgement> {
            Err(JudgeError::Provider("service unavailable".into()))
        }
    }

    struct SlowClassifier;

    #[async_trait]
    impl TextClassifier for SlowClassifier {
        fn name(&self) -> &str {
            "slow"
        }

        async fn classify(
            &self,
            _prompt_text: &str,
            _descriptor: &SkillDescriptor,
        ) -> crate::Result<Judgement> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Judgement::invoke(Confidence::High, "too late"))
        }
    }

    fn prompt(text: &str) -> BlindPrompt {
        BlindPrompt {
            id: PromptId(3),
            text: text.to_string(),
        }
    }

    fn descriptor() -> SkillDescriptor {
        SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets.",
        )
    }

    #[tokio::test]
    async fn test_decide_passes_judgement_through() {
        let matcher = Matcher::new(Arc::new(KeywordClassifier::new()));
        let decision = matcher
            .decide(&prompt("draft a thread on productivity tips"), &descriptor())
            .await;
        assert_eq!(decision.prompt_id, PromptId(3));
        assert!(decision.invoked);
        assert!(!decision.forced);
    }

    #[tokio::test]
    async fn test_error_fails_closed() {
        let matcher = Matcher::new(Arc::new(FailingClassifier));
        let decision = matcher.decide(&prompt("draft a thread"), &descriptor()).await;
        assert!(!decision.invoked);
        assert_eq!(decision.confidence, Confidence::Low);
        assert!(decision.forced);
        assert!(decision.justification.contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_undecidable_fails_closed() {
        let matcher = Matcher::new(Arc::new(KeywordClassifier::new()));
        let decision = matcher.decide(&prompt("can you help?"), &descriptor()).await;
        assert!(!decision.invoked);
        assert_eq!(decision.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn test_timeout_fails_closed() {
        let matcher =
            Matcher::new(Arc::new(SlowClassifier)).with_timeout(Duration::from_millis(20));
        let decision = matcher.decide(&prompt("draft a thread"), &descriptor()).await;
        assert!(!decision.invoked);
        assert!(decision.forced);
        assert!(decision.justification.contains("timed out"));
    }
}
