//! Skill definition and parsing
//!
//! Each skill is a folder containing SKILL.md with YAML frontmatter

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use skilltune_types::SkillDescriptor;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the skill definition inside a skill folder
pub const SKILL_FILE: &str = "SKILL.md";

/// Skill metadata extracted from YAML frontmatter
#[derive(Debug, Clone, Deserialize)]
pub struct SkillMetadata {
    /// Skill name (max 64 chars, lowercase letters/numbers/hyphens only)
    pub name: String,
    /// Skill description (max 1024 chars, describes WHAT and WHEN)
    pub description: String,
}

/// A skill file on disk with its trigger descriptor
#[derive(Debug, Clone)]
pub struct Skill {
    /// Name and description from the frontmatter
    pub descriptor: SkillDescriptor,
    /// Full path to the SKILL.md file
    pub path: PathBuf,
    /// Markdown body after the frontmatter
    pub body: String,
}

impl Skill {
    /// Load a skill from a skill directory or a direct path to its SKILL.md
    pub fn from_path(path: &Path) -> Result<Self> {
        let skill_file = if path.is_dir() {
            path.join(SKILL_FILE)
        } else {
            path.to_path_buf()
        };

        if !skill_file.exists() {
            return Err(anyhow!("{} not found at {:?}", SKILL_FILE, skill_file));
        }

        let content = fs::read_to_string(&skill_file)
            .with_context(|| format!("Failed to read {:?}", skill_file))?;

        let (metadata, body) = parse_skill_content(&content)
            .with_context(|| format!("Failed to parse skill from {:?}", skill_file))?;

        Ok(Self {
            descriptor: SkillDescriptor::new(metadata.name, metadata.description),
            path: skill_file,
            body,
        })
    }

    /// Get the skill name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Get the skill description
    pub fn description(&self) -> &str {
        &self.descriptor.description
    }
}

/// Parse skill content to extract frontmatter metadata and body
pub fn parse_skill_content(content: &str) -> Result<(SkillMetadata, String)> {
    let frontmatter_re = Regex::new(r"^---\s*\n([\s\S]*?)\n---\s*(?:\n([\s\S]*))?$")
        .map_err(|e| anyhow!("Failed to compile regex: {}", e))?;

    let captures = frontmatter_re
        .captures(content)
        .ok_or_else(|| anyhow!("No valid YAML frontmatter found"))?;

    let yaml_str = captures
        .get(1)
        .ok_or_else(|| anyhow!("Failed to extract frontmatter"))?
        .as_str();

    let body = captures.get(2).map(|m| m.as_str()).unwrap_or("");

    let metadata: SkillMetadata =
        serde_yaml::from_str(yaml_str).with_context(|| "Failed to parse YAML frontmatter")?;

    Ok((metadata, body.to_string()))
}
