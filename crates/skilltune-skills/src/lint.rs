//! Deterministic checks for skill descriptors and skill folders
//!
//! [`lint_descriptor`] covers the frontmatter and runs before a tuning
//! session and again on the tuned result, since a tuned description may grow
//! past the length budget. [`lint_skill`] adds the checks on the SKILL.md
//! body, the reference files it links and the files in the skill folder.

use regex::Regex;
use serde::Serialize;
use skilltune_types::SkillDescriptor;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::skill::Skill;

/// Maximum allowed name length
pub const MAX_NAME_LENGTH: usize = 64;
/// Maximum allowed description length
pub const MAX_DESCRIPTION_LENGTH: usize = 1024;
/// Words a skill name must not contain
pub const RESERVED_WORDS: [&str; 2] = ["anthropic", "claude"];
/// Maximum lines in SKILL.md, and the size past which a reference file needs a table of contents
pub const MAX_BODY_LINES: usize = 500;
/// Reference files this long must have a table of contents
pub const TOC_REQUIRED_LINES: usize = 1000;

const MAX_LISTED: usize = 5;

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Allowed only under `scripts/`
const SCRIPT_EXTENSIONS: [&str; 29] = [
    "py", "pyi", "pyw", "js", "ts", "mjs", "cjs", "jsx", "tsx", "sh", "bash", "zsh", "fish", "rb",
    "go", "rs", "pl", "php", "lua", "r", "yaml", "yml", "json", "toml", "ini", "cfg", "conf",
    "csv", "txt",
];

const IGNORED_DIRS: [&str; 15] = [
    "__pycache__",
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    ".venv",
    "venv",
    ".env",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    "dist",
    "build",
    ".tox",
    ".eggs",
];

const IGNORED_FILES: [&str; 6] = [
    ".gitignore",
    ".gitattributes",
    ".editorconfig",
    ".DS_Store",
    "Thumbs.db",
    "__init__.py",
];

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9-]+$").unwrap_or_else(|err| panic!("invalid NAME_RE regex: {err}"))
});

static FIRST_PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(I|my|we|our)\b")
        .unwrap_or_else(|err| panic!("invalid FIRST_PERSON_RE regex: {err}"))
});

/// Drive letters (`C:\`) and UNC prefixes (`\\server`)
static WINDOWS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z]:\\|\\\\")
        .unwrap_or_else(|err| panic!("invalid WINDOWS_PATH_RE regex: {err}"))
});

static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}",
        r"\x{1F700}-\x{1F77F}\x{1F780}-\x{1F7FF}\x{1F800}-\x{1F8FF}",
        r"\x{1F900}-\x{1F9FF}\x{1FA00}-\x{1FA6F}\x{1FA70}-\x{1FAFF}",
        r"\x{2702}-\x{27B0}\x{1F1E0}-\x{1F1FF}]+",
    ))
    .unwrap_or_else(|err| panic!("invalid EMOJI_RE regex: {err}"))
});

static MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[.*?\]\(([^)]+\.md)\)")
        .unwrap_or_else(|err| panic!("invalid MD_LINK_RE regex: {err}"))
});

static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`[^`]+`").unwrap_or_else(|err| panic!("invalid INLINE_CODE_RE regex: {err}"))
});

static TOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^##\s*(Contents|Table of Contents)\s*$")
        .unwrap_or_else(|err| panic!("invalid TOC_RE regex: {err}"))
});

/// How serious a lint finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks registration
    Error,
    /// Reported, does not block
    Warning,
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    /// Check identifier, e.g. `name-characters`
    pub check: &'static str,
    /// Error or warning
    pub severity: Severity,
    /// Human-readable explanation
    pub message: String,
}

/// All findings for one descriptor or skill folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintReport {
    /// Skill name the report is about
    pub skill: String,
    /// SKILL.md the report was built from, absent for a bare descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Failed checks, errors and warnings mixed in check order
    pub findings: Vec<LintFinding>,
}

impl LintReport {
    fn new(skill: impl Into<String>) -> Self {
        Self {
            skill: skill.into(),
            path: None,
            findings: Vec::new(),
        }
    }

    /// True when no finding is an error
    pub fn passed(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Findings with error severity
    pub fn errors(&self) -> impl Iterator<Item = &LintFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    /// Findings with warning severity
    pub fn warnings(&self) -> impl Iterator<Item = &LintFinding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    fn push(&mut self, check: &'static str, severity: Severity, message: String) {
        self.findings.push(LintFinding {
            check,
            severity,
            message,
        });
    }
}

impl fmt::Display for LintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() { "PASS" } else { "FAIL" };
        writeln!(f, "Descriptor lint for '{}': {}", self.skill, status)?;
        if let Some(path) = &self.path {
            writeln!(f, "  path: {}", path.display())?;
        }
        for finding in &self.findings {
            let icon = match finding.severity {
                Severity::Error => "x",
                Severity::Warning => "!",
            };
            writeln!(f, "  {} {}: {}", icon, finding.check, finding.message)?;
        }
        Ok(())
    }
}

/// Run every metadata check against a descriptor
pub fn lint_descriptor(descriptor: &SkillDescriptor) -> LintReport {
    let mut report = LintReport::new(descriptor.name.clone());

    let name = descriptor.name.as_str();
    if name.is_empty() {
        report.push("name-present", Severity::Error, "Skill name cannot be empty".into());
    } else {
        if name.len() > MAX_NAME_LENGTH {
            report.push(
                "name-length",
                Severity::Error,
                format!("Name is {} chars (max {})", name.len(), MAX_NAME_LENGTH),
            );
        }

        if !NAME_RE.is_match(name) {
            report.push(
                "name-characters",
                Severity::Error,
                format!(
                    "Skill name '{}' must contain only lowercase letters, numbers, and hyphens",
                    name
                ),
            );
        }

        let lowered = name.to_lowercase();
        if let Some(word) = RESERVED_WORDS.iter().find(|w| lowered.contains(*w)) {
            report.push(
                "name-reserved",
                Severity::Error,
                format!("Skill name '{}' must not contain reserved word '{}'", name, word),
            );
        }
    }

    let description = descriptor.description.as_str();
    if description.trim().is_empty() {
        report.push(
            "description-present",
            Severity::Error,
            "Skill description cannot be empty".into(),
        );
        return report;
    }

    if description.len() > MAX_DESCRIPTION_LENGTH {
        report.push(
            "description-length",
            Severity::Error,
            format!(
                "Description is {} chars (max {})",
                description.len(),
                MAX_DESCRIPTION_LENGTH
            ),
        );
    }

    if let Some(found) = FIRST_PERSON_RE.find(description) {
        report.push(
            "description-third-person",
            Severity::Warning,
            format!(
                "Description should use third person, found first-person '{}'",
                found.as_str()
            ),
        );
    }

    if !description.to_lowercase().contains("when") {
        report.push(
            "description-triggers",
            Severity::Warning,
            "Description should include 'Use when...' trigger phrases".into(),
        );
    }

    report
}

/// Metadata checks plus the SKILL.md body, its reference files and the
/// file types inside the skill folder
pub fn lint_skill(skill: &Skill) -> LintReport {
    let mut report = lint_descriptor(&skill.descriptor);
    report.path = Some(skill.path.clone());

    lint_body(&skill.body, &mut report);
    if let Some(dir) = skill.path.parent() {
        lint_references(dir, &skill.body, &mut report);
        lint_file_types(dir, &mut report);
    }

    report
}

/// Lint the skill at `path`, either a skill folder or its SKILL.md.
///
/// A file that cannot be loaded still gets a report, named after its folder,
/// with a single `skill-file` error carrying the parse failure.
pub fn lint_path(path: &Path) -> LintReport {
    match Skill::from_path(path) {
        Ok(skill) => lint_skill(&skill),
        Err(err) => {
            let mut report = LintReport::new(folder_name(path));
            report.path = Some(path.to_path_buf());
            report.push("skill-file", Severity::Error, format!("{err:#}"));
            report
        }
    }
}

fn folder_name(path: &Path) -> String {
    let folder = if path.is_dir() { Some(path) } else { path.parent() };
    folder
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

fn lint_body(body: &str, report: &mut LintReport) {
    let lines = body.lines().count();
    if lines > MAX_BODY_LINES {
        report.push(
            "body-length",
            Severity::Error,
            format!("SKILL.md body is {} lines (max {})", lines, MAX_BODY_LINES),
        );
    }

    if WINDOWS_PATH_RE.is_match(body) {
        report.push(
            "body-unix-paths",
            Severity::Error,
            "Use forward slashes, not backslashes for paths".into(),
        );
    }

    let emojis: Vec<String> = body
        .lines()
        .enumerate()
        .flat_map(|(index, line)| {
            EMOJI_RE
                .find_iter(line)
                .map(move |m| format!("'{}' (line {})", m.as_str(), index + 1))
        })
        .collect();
    if !emojis.is_empty() {
        report.push(
            "body-emojis",
            Severity::Error,
            format!("Emojis found: {}", listed(&emojis)),
        );
    }
}

/// Targets of `[text](file.md)` links outside fenced blocks and inline code
fn markdown_refs(content: &str) -> Vec<String> {
    let mut in_fence = false;
    let mut refs = Vec::new();

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let stripped = INLINE_CODE_RE.replace_all(line, "");
        refs.extend(
            MD_LINK_RE
                .captures_iter(&stripped)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        );
    }

    refs
}

fn lint_references(dir: &Path, body: &str, report: &mut LintReport) {
    for reference in markdown_refs(body) {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            continue;
        }

        if too_deep(&reference) {
            report.push(
                "reference-depth",
                Severity::Error,
                format!("Reference too deep (max one level): {}", reference),
            );
        }

        let path = dir.join(&reference);
        if !path.is_file() {
            report.push(
                "reference-exists",
                Severity::Error,
                format!("Referenced file not found: {}", reference),
            );
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                report.push(
                    "reference-exists",
                    Severity::Error,
                    format!("Cannot read {}: {}", reference, err),
                );
                continue;
            }
        };

        let nested = markdown_refs(&content);
        if !nested.is_empty() {
            report.push(
                "reference-nesting",
                Severity::Error,
                format!(
                    "Reference files should not link to other .md files: {} links {}",
                    reference,
                    listed(&nested)
                ),
            );
        }

        lint_toc(&reference, &content, report);
    }
}

/// More than one `..` or more than one directory below the skill folder
fn too_deep(reference: &str) -> bool {
    let normalized = reference.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').collect();
    let parents = parts.iter().filter(|part| **part == "..").count();
    let forward = parts[..parts.len() - 1]
        .iter()
        .filter(|part| !matches!(**part, ".." | "."))
        .count();
    parents > 1 || forward > 1
}

fn lint_toc(reference: &str, content: &str, report: &mut LintReport) {
    let lines = content.lines().count();
    if lines <= MAX_BODY_LINES || TOC_RE.is_match(content) {
        return;
    }

    let severity = if lines >= TOC_REQUIRED_LINES {
        Severity::Error
    } else {
        Severity::Warning
    };
    report.push(
        "reference-toc",
        severity,
        format!(
            "{} is {} lines and has no '## Contents' or '## Table of Contents' section",
            reference, lines
        ),
    );
}

/// Markdown anywhere, scripts and their data files only under `scripts/`
fn lint_file_types(dir: &Path, report: &mut LintReport) {
    let unexpected: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !IGNORED_DIRS.iter().any(|ignored| entry.file_name() == *ignored)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(dir).ok()?;
            (!allowed_file(relative)).then(|| relative.display().to_string())
        })
        .collect();

    if !unexpected.is_empty() {
        report.push(
            "file-types",
            Severity::Error,
            format!("Unexpected files found: {}", listed(&unexpected)),
        );
    }
}

fn allowed_file(relative: &Path) -> bool {
    let ignored = relative
        .file_name()
        .is_some_and(|name| IGNORED_FILES.iter().any(|file| name == *file));
    if ignored {
        return true;
    }

    let extension = relative
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if MARKDOWN_EXTENSIONS.contains(&extension.as_str()) {
        return true;
    }

    let in_scripts = relative
        .components()
        .any(|component| component.as_os_str() == "scripts");
    in_scripts && SCRIPT_EXTENSIONS.contains(&extension.as_str())
}

fn listed(items: &[String]) -> String {
    let mut text = items
        .iter()
        .take(MAX_LISTED)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if items.len() > MAX_LISTED {
        text.push_str(&format!(" and {} more", items.len() - MAX_LISTED));
    }
    text
}
