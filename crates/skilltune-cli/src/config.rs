use anyhow::{anyhow, Context};
use serde::Deserialize;
use skilltune_eval::{TuningConfig, DEFAULT_MAX_CONCURRENCY, MAX_TUNING_ITERATIONS};
use skilltune_types::VerdictThresholds;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config template created when no config exists
const DEFAULT_CONFIG: &str = r#"
[judge]
kind = "keyword"  # keyword, openai or ollama
model = "gpt-4o-mini"
base_url = ""  # Optional: Set via OPENAI_BASE_URL / OLLAMA_BASE_URL env var
api_key = ""  # Set via OPENAI_API_KEY env var
timeout_secs = 60

[evaluation]
max_concurrency = 40  # judge calls in flight per round

[tuning]
max_iterations = 5
ready_threshold = 95  # percent
tuning_threshold = 85  # percent

[skills]
directories = ["~/.claude/skills", ".claude/skills"]

[history]
enabled = true
path = "~/.skilltune/history.db"

[logging]
level = "info"  # trace, debug, info, warn, error
format = "pretty"  # pretty or json
"#;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum JudgeKind {
    #[default]
    Keyword,
    OpenAI,
    Ollama,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JudgeConfig {
    pub kind: JudgeKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            kind: JudgeKind::Keyword,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl JudgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EvaluationConfig {
    pub max_concurrency: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TuningSection {
    pub max_iterations: usize,
    pub ready_threshold: u32,
    pub tuning_threshold: u32,
}

impl Default for TuningSection {
    fn default() -> Self {
        let thresholds = VerdictThresholds::default();
        Self {
            max_iterations: MAX_TUNING_ITERATIONS,
            ready_threshold: thresholds.ready_percent,
            tuning_threshold: thresholds.tuning_percent,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SkillsConfig {
    /// Scanned in order; earlier directories win on name clashes
    pub directories: Vec<String>,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            directories: vec!["~/.claude/skills".to_string(), ".claude/skills".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.skilltune/history.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub judge: JudgeConfig,
    pub evaluation: EvaluationConfig,
    pub tuning: TuningSection,
    pub skills: SkillsConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the global config path: ~/.skilltune/skilltune.toml
    fn global_config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".skilltune").join("skilltune.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()?;

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)
                    .with_context(|| format!("Failed to create {}", config_dir.display()))?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.skilltune/skilltune.toml (auto-created if missing)
    /// 2. Local override: ./skilltune.toml (optional)
    /// 3. Environment variables with SKILLTUNE__ prefix
    /// 4. OPENAI_API_KEY, OPENAI_BASE_URL and OLLAMA_BASE_URL (highest priority)
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let global_config_path = Self::ensure_global_config()?;
        Self::load_from(&global_config_path, Path::new("skilltune.toml"))
    }

    /// Layers 1-4 with explicit file locations
    pub fn load_from(global: &Path, local: &Path) -> anyhow::Result<Self> {
        let mut config_builder = config::Config::builder()
            .add_source(config::File::from(global.to_path_buf()).required(false))
            .add_source(config::File::from(local.to_path_buf()).required(false))
            .add_source(config::Environment::with_prefix("SKILLTUNE").separator("__"));

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config_builder = config_builder.set_override("judge.api_key", key)?;
        }

        let mut config: Self = config_builder.build()?.try_deserialize()?;

        // base url overrides only apply to the judge they belong to
        let url_var = match config.judge.kind {
            JudgeKind::OpenAI => Some("OPENAI_BASE_URL"),
            JudgeKind::Ollama => Some("OLLAMA_BASE_URL"),
            JudgeKind::Keyword => None,
        };
        if let Some(url) = url_var.and_then(|var| env::var(var).ok()) {
            config.judge.base_url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.thresholds()?;
        if self.evaluation.max_concurrency == 0 {
            return Err(anyhow!("evaluation.max_concurrency must be at least 1"));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> anyhow::Result<VerdictThresholds> {
        Ok(VerdictThresholds::new(
            self.tuning.ready_threshold,
            self.tuning.tuning_threshold,
        )?)
    }

    pub fn tuning_config(&self) -> anyhow::Result<TuningConfig> {
        Ok(TuningConfig {
            max_iterations: self.tuning.max_iterations,
            thresholds: self.thresholds()?,
        })
    }

    /// Skills directories with `~` expanded
    pub fn skill_directories(&self) -> Vec<PathBuf> {
        self.skills.directories.iter().map(|d| expand_home(d)).collect()
    }

    pub fn history_path(&self) -> PathBuf {
        expand_home(&self.history.path)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
        _ => PathBuf::from(path),
    }
}
