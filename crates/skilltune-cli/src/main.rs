mod config;
mod service;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use crate::config::Config;
use crate::service::{SkilltuneService, TuneOptions};
use skilltune_logging::{init_logging, LogFormat};
use skilltune_types::SeedFailure;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "skilltune",
    about = "Blind trigger evaluation and description tuning for agent skills"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Expect {
    Yes,
    No,
}

#[derive(clap::Args, Clone)]
struct SeedArgs {
    /// A real prompt the skill misfired on
    #[arg(long, requires = "seed_expect")]
    seed_prompt: Option<String>,

    /// Whether the skill should have been invoked for the seed prompt
    #[arg(long, value_enum, requires = "seed_prompt")]
    seed_expect: Option<Expect>,
}

impl SeedArgs {
    fn into_seed(self) -> Option<SeedFailure> {
        match (self.seed_prompt, self.seed_expect) {
            (Some(text), Some(expect)) => Some(SeedFailure::new(text, matches!(expect, Expect::Yes))),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered skills
    List,
    /// Check a skill's metadata, SKILL.md body, references and files
    Lint {
        /// Skill name, skill folder or SKILL.md path
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        skill: Option<String>,

        /// Lint every skill in the configured directories
        #[arg(long)]
        all: bool,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the 40 labeled test prompts as YAML
    Generate {
        /// Skill name, skill folder or SKILL.md path
        skill: String,

        #[command(flatten)]
        seed: SeedArgs,
    },
    /// Run one blind evaluation round and print the score report
    Evaluate {
        /// Skill name, skill folder or SKILL.md path
        skill: String,

        /// Hand-written prompt set (YAML) instead of a generated one
        #[arg(short, long)]
        prompts: Option<PathBuf>,

        #[command(flatten)]
        seed: SeedArgs,
    },
    /// Evaluate and tune until READY or escalation
    Tune {
        /// Skill name, skill folder or SKILL.md path
        skill: String,

        /// Hand-written prompt set (YAML) instead of a generated one
        #[arg(short, long)]
        prompts: Option<PathBuf>,

        #[command(flatten)]
        seed: SeedArgs,

        /// Tuning passes before escalating (overrides config)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Write the outcome JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show recorded tuning sessions
    History {
        /// Show the rounds of this session
        #[arg(long)]
        session: Option<String>,

        /// Number of recent sessions to show
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load()?;
    init_logging(&config.logging.level, LogFormat::parse(&config.logging.format))?;

    let service = SkilltuneService::new(config);

    match cli.command {
        Commands::List => service.list().await?,
        Commands::Lint { skill, all, json } => {
            let passed = match skill {
                Some(skill) if !all => service.lint(&skill, json).await?,
                _ => service.lint_all(json).await?,
            };
            if !passed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Generate { skill, seed } => service.generate(&skill, seed.into_seed()).await?,
        Commands::Evaluate {
            skill,
            prompts,
            seed,
        } => {
            service
                .evaluate(&skill, prompts.as_deref(), seed.into_seed())
                .await?
        }
        Commands::Tune {
            skill,
            prompts,
            seed,
            max_iterations,
            output,
        } => {
            let options = TuneOptions {
                prompts,
                seed: seed.into_seed(),
                max_iterations,
                output,
            };
            service.tune(&skill, options).await?;
        }
        Commands::History { session, limit } => {
            service.history(session.as_deref(), limit).await?
        }
    }

    Ok(ExitCode::SUCCESS)
}
