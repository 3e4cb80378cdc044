use crate::config::{Config, JudgeKind};
use anyhow::{Context, Result};
use chrono::Utc;
use skilltune_eval::{BlindEvaluator, PromptSet, TuningSession};
use skilltune_history::HistoryStore;
use skilltune_judge::{JudgeProvider, KeywordClassifier, LlmClassifier, Matcher, TextClassifier};
use serde::Serialize;
use skilltune_skills::{lint_descriptor, lint_path, DescriptorStore, LintReport, Skill};
use skilltune_types::{SeedFailure, SessionOutcome, TuneError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Options of the `tune` command
#[derive(Debug, Clone, Default)]
pub struct TuneOptions {
    pub prompts: Option<PathBuf>,
    pub seed: Option<SeedFailure>,
    pub max_iterations: Option<usize>,
    pub output: Option<PathBuf>,
}

/// Wires config, store, judge and history together for each command
pub struct SkilltuneService {
    config: Config,
}

impl SkilltuneService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Empty store over the configured directories
    fn store(&self) -> DescriptorStore {
        let mut store = DescriptorStore::new();
        for dir in self.config.skill_directories() {
            store = store.add_directory(dir);
        }
        store
    }

    /// Store with every skill from the configured directories
    fn discover(&self) -> Result<DescriptorStore> {
        let mut store = self.store();
        store.discover()?;
        Ok(store)
    }

    /// Resolve `<skill>`: a path to a skill folder / SKILL.md, or a discovered name
    async fn resolve(&self, skill: &str) -> Result<(Arc<DescriptorStore>, String)> {
        let path = Path::new(skill);
        if path.exists() {
            let loaded = Skill::from_path(path)?;
            let store = DescriptorStore::new();
            let name = loaded.name().to_string();
            store.put(loaded.descriptor).await?;
            info!("Loaded skill '{}' from {:?}", name, loaded.path);
            return Ok((Arc::new(store), name));
        }

        let store = self.discover()?;
        store.get(skill).await?;
        Ok((Arc::new(store), skill.to_string()))
    }

    fn classifier(&self) -> Arc<dyn TextClassifier> {
        let judge = &self.config.judge;
        match judge.kind {
            JudgeKind::Keyword => Arc::new(KeywordClassifier::new()),
            JudgeKind::OpenAI => Arc::new(LlmClassifier::new(JudgeProvider::OpenAI {
                model: judge.model.clone(),
                api_key: judge.api_key().map(str::to_string),
                base_url: judge.base_url().map(str::to_string),
            })),
            JudgeKind::Ollama => Arc::new(LlmClassifier::new(JudgeProvider::ollama(
                &judge.model,
                judge.base_url().unwrap_or("http://localhost:11434"),
            ))),
        }
    }

    fn session(
        &self,
        store: Arc<DescriptorStore>,
        prompts: Option<&Path>,
        max_iterations: Option<usize>,
    ) -> Result<TuningSession> {
        let matcher = Matcher::new(self.classifier()).with_timeout(self.config.judge.timeout());
        let evaluator =
            BlindEvaluator::new(matcher).with_max_concurrency(self.config.evaluation.max_concurrency);

        let mut tuning = self.config.tuning_config()?;
        if let Some(max) = max_iterations {
            tuning.max_iterations = max;
        }

        let session = TuningSession::new(store, evaluator, tuning);
        match prompts {
            Some(path) => Ok(session.with_prompts(PromptSet::load(path)?)),
            None => Ok(session),
        }
    }

    /// `list`: discovered skills with their descriptions
    pub async fn list(&self) -> Result<()> {
        let store = self.discover()?;
        println!("{}", store.generate_skills_list().await);
        Ok(())
    }

    /// `lint <skill>`: returns whether the skill passed.
    ///
    /// Discovery skips skills that fail to parse or lint, so a name is looked
    /// up on disk and the file itself is linted.
    pub async fn lint(&self, skill: &str, json: bool) -> Result<bool> {
        let path = Path::new(skill);
        let file = if path.exists() {
            path.to_path_buf()
        } else {
            self.store()
                .locate(skill)
                .ok_or_else(|| TuneError::DescriptorNotFound(skill.to_string()))?
        };

        let report = lint_path(&file);
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", report);
        }
        Ok(report.passed())
    }

    /// `lint --all`: every SKILL.md in the configured directories
    pub async fn lint_all(&self, json: bool) -> Result<bool> {
        let reports: Vec<LintReport> = self
            .store()
            .skill_files()
            .iter()
            .map(|file| lint_path(file))
            .collect();
        let summary = LintSummary::new(&reports);
        info!(
            "Linted {} skill(s): {} failed",
            reports.len(),
            summary.failed
        );

        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            for report in &reports {
                print!("{}", report);
            }
            println!(
                "{} skill(s) linted, {} failed, {} warning(s)",
                reports.len(),
                summary.failed,
                summary.warnings
            );
        }
        Ok(summary.passed)
    }

    /// `generate`: the labeled prompt set as YAML
    pub async fn generate(&self, skill: &str, seed: Option<SeedFailure>) -> Result<()> {
        let (store, name) = self.resolve(skill).await?;
        let descriptor = store.get(&name).await?;
        let session = self.session(Arc::clone(&store), None, None)?;
        let prompts = session.prompt_set(&descriptor, seed.as_ref())?;
        print!("{}", prompts.to_yaml()?);
        Ok(())
    }

    /// `evaluate`: one blind round, report as JSON
    pub async fn evaluate(
        &self,
        skill: &str,
        prompts: Option<&Path>,
        seed: Option<SeedFailure>,
    ) -> Result<()> {
        let (store, name) = self.resolve(skill).await?;
        let session = self.session(store, prompts, None)?;
        let (_, report) = session.evaluate_once(&name, seed.as_ref()).await?;
        info!("'{}' scored {}: {}", name, report.overall, report.verdict);
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    /// `tune`: the full session. Ctrl+C stops it before the next round.
    pub async fn tune(&self, skill: &str, options: TuneOptions) -> Result<SessionOutcome> {
        let (store, name) = self.resolve(skill).await?;
        let session = self.session(store, options.prompts.as_deref(), options.max_iterations)?;

        let cancel = session.cancellation_token();
        let interrupt = tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                return;
            }
            warn!("Received interrupt, stopping after the current round");
            cancel.cancel();
        });

        let started_at = Utc::now();
        let result = session.run(&name, options.seed.as_ref()).await;
        interrupt.abort();
        let outcome = result?;

        info!(
            "Session for '{}' finished: {} after {} round(s)",
            name,
            outcome.label(),
            outcome.history().len()
        );
        report_lint(&lint_descriptor(outcome.recommended_descriptor()));

        if self.config.history.enabled {
            if let Err(e) = self.record(&name, started_at, &outcome).await {
                warn!("Failed to record session history: {:#}", e);
            }
        }

        let json = serde_json::to_string_pretty(&outcome)?;
        match &options.output {
            Some(path) => {
                fs::write(path, &json).with_context(|| format!("Failed to write {:?}", path))?;
                info!("Wrote session outcome to {:?}", path);
            }
            None => println!("{}", json),
        }

        Ok(outcome)
    }

    /// `history`: recent sessions, or the rounds of one session
    pub async fn history(&self, session_id: Option<&str>, limit: i64) -> Result<()> {
        let store = self.open_history().await?;
        let json = match session_id {
            Some(id) => serde_json::to_string_pretty(&store.rounds_for(id).await?)?,
            None => serde_json::to_string_pretty(&store.recent_sessions(limit).await?)?,
        };
        println!("{}", json);
        Ok(())
    }

    async fn open_history(&self) -> Result<HistoryStore> {
        let path = self.config.history_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        HistoryStore::new(&path.to_string_lossy()).await
    }

    async fn record(
        &self,
        skill: &str,
        started_at: chrono::DateTime<Utc>,
        outcome: &SessionOutcome,
    ) -> Result<()> {
        let store = self.open_history().await?;
        let id = store.record_session(skill, started_at, outcome).await?;
        info!("Session recorded as {}", id);
        Ok(())
    }
}

/// JSON shape of `lint --all --json`
#[derive(Debug, Serialize)]
struct LintSummary<'a> {
    passed: bool,
    failed: usize,
    errors: usize,
    warnings: usize,
    skills: &'a [LintReport],
}

impl<'a> LintSummary<'a> {
    fn new(reports: &'a [LintReport]) -> Self {
        Self {
            passed: reports.iter().all(LintReport::passed),
            failed: reports.iter().filter(|r| !r.passed()).count(),
            errors: reports.iter().map(|r| r.errors().count()).sum(),
            warnings: reports.iter().map(|r| r.warnings().count()).sum(),
            skills: reports,
        }
    }
}

fn report_lint(report: &LintReport) {
    for finding in &report.findings {
        warn!("Tuned descriptor lint {}: {}", finding.check, finding.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(dir: &Path, name: &str, description: &str) -> PathBuf {
        let skill_dir = dir.join(name);
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(
            skill_dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n\n# {name}\n"),
        )
        .unwrap();
        skill_dir
    }

    fn service_for(dir: &Path) -> SkilltuneService {
        let mut config = Config::default();
        config.skills.directories = vec![dir.to_string_lossy().into_owned()];
        config.history.enabled = false;
        SkilltuneService::new(config)
    }

    #[tokio::test]
    async fn test_resolve_by_name_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = write_skill(
            dir.path(),
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets.",
        );
        let service = service_for(dir.path());

        let (_, by_name) = service.resolve("tweet-writer").await.unwrap();
        assert_eq!(by_name, "tweet-writer");

        let (store, by_path) = service.resolve(&skill_dir.to_string_lossy()).await.unwrap();
        assert_eq!(by_path, "tweet-writer");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lint_reports_invalid_name_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = write_skill(dir.path(), "Tweet_Writer", "Writes tweets. Use when drafting tweets.");
        let service = service_for(dir.path());

        assert!(!service.lint(&skill_dir.to_string_lossy(), false).await.unwrap());
    }

    #[tokio::test]
    async fn test_lint_by_name_reads_skills_discovery_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(dir.path(), "Tweet_Writer", "Writes tweets. Use when drafting tweets.");
        let half_done = dir.path().join("half-done");
        fs::create_dir_all(&half_done).unwrap();
        fs::write(half_done.join("SKILL.md"), "# frontmatter still missing\n").unwrap();
        let service = service_for(dir.path());

        assert!(!service.lint("Tweet_Writer", false).await.unwrap());
        assert!(!service.lint("half-done", true).await.unwrap());

        let err = service.lint("missing-skill", false).await.unwrap_err();
        assert!(err.to_string().contains("missing-skill"));
    }

    #[tokio::test]
    async fn test_lint_all() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets.",
        );
        write_skill(dir.path(), "blog-writer", "Writes blog posts. Use when blogging.");
        let service = service_for(dir.path());
        assert!(service.lint_all(true).await.unwrap());

        write_skill(dir.path(), "Bad_Name", "Writes things. Use when asked.");
        assert!(!service.lint_all(false).await.unwrap());
    }

    #[test]
    fn test_lint_summary_counts() {
        let reports = vec![
            lint_descriptor(&skilltune_types::SkillDescriptor::new(
                "tweet-writer",
                "Drafts tweets. Use when tweeting.",
            )),
            lint_descriptor(&skilltune_types::SkillDescriptor::new("Bad_Name", "I do things")),
        ];
        let summary = LintSummary::new(&reports);
        assert!(!summary.passed);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 2);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["skills"][1]["skill"], "Bad_Name");
        assert_eq!(json["skills"][1]["findings"][0]["severity"], "error");
        assert!(json["skills"][0].get("path").is_none());
    }

    #[tokio::test]
    async fn test_resolve_unknown_skill_fails() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_for(dir.path());
        let err = service.resolve("missing-skill").await.unwrap_err();
        assert!(err.to_string().contains("missing-skill"));
    }

    #[tokio::test]
    async fn test_tune_writes_outcome_file() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets.",
        );
        let output = dir.path().join("outcome.json");
        let service = service_for(dir.path());

        let outcome = service
            .tune(
                "tweet-writer",
                TuneOptions {
                    output: Some(output.clone()),
                    ..TuneOptions::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.label(), "READY");
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["outcome"], "READY");
    }

    #[tokio::test]
    async fn test_tune_records_history() {
        let dir = tempfile::tempdir().unwrap();
        write_skill(
            dir.path(),
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets.",
        );
        let mut config = Config::default();
        config.skills.directories = vec![dir.path().to_string_lossy().into_owned()];
        config.history.path = dir.path().join("history.db").to_string_lossy().into_owned();
        let service = SkilltuneService::new(config);

        service
            .tune(
                "tweet-writer",
                TuneOptions {
                    output: Some(dir.path().join("out.json")),
                    max_iterations: Some(1),
                    ..TuneOptions::default()
                },
            )
            .await
            .unwrap();

        let history = service.open_history().await.unwrap();
        let sessions = history.recent_sessions(5).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].skill, "tweet-writer");
    }
}
