//! Blind evaluator: fans one matcher call per prompt out over a JoinSet

use skilltune_judge::Matcher;
use skilltune_types::{BlindPrompt, Decision, PromptId, SkillDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// All 40 judge calls in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 40;

#[derive(Clone)]
pub struct BlindEvaluator {
    matcher: Matcher,
    max_concurrency: usize,
}

impl BlindEvaluator {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Judge every prompt independently and wait for all of them.
    ///
    /// Returns one decision per prompt, in prompt order. A judge task that
    /// panics is recorded as a forced NO_INVOKE.
    pub async fn run_all(
        &self,
        prompts: &[BlindPrompt],
        descriptor: Arc<SkillDescriptor>,
    ) -> Vec<Decision> {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut owners: HashMap<tokio::task::Id, PromptId> = HashMap::with_capacity(prompts.len());

        for prompt in prompts.iter().cloned() {
            let matcher = self.matcher.clone();
            let descriptor = Arc::clone(&descriptor);
            let permits = Arc::clone(&permits);
            let prompt_id = prompt.id;

            let handle = tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                matcher.decide(&prompt, &descriptor).await
            });
            owners.insert(handle.id(), prompt_id);
        }

        let mut decisions: HashMap<PromptId, Decision> = HashMap::with_capacity(prompts.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, decision)) => {
                    decisions.insert(decision.prompt_id, decision);
                }
                Err(e) => {
                    let Some(&prompt_id) = owners.get(&e.id()) else {
                        warn!("Judge task {} failed and has no owner: {}", e.id(), e);
                        continue;
                    };
                    let reason = if e.is_panic() {
                        "judge task panicked".to_string()
                    } else {
                        e.to_string()
                    };
                    warn!(prompt = %prompt_id, "{}; recording NO_INVOKE", reason);
                    decisions.insert(prompt_id, Decision::forced_no_invoke(prompt_id, reason));
                }
            }
        }

        debug!(
            "Collected {} decisions for '{}' via {}",
            decisions.len(),
            descriptor.name,
            self.matcher.classifier_name()
        );

        prompts
            .iter()
            .map(|p| {
                decisions
                    .remove(&p.id)
                    .unwrap_or_else(|| Decision::forced_no_invoke(p.id, "no decision recorded"))
            })
            .collect()
    }
}
