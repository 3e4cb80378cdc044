//! Descriptor store: the single source of truth for skill descriptors
//!
//! Readers get an `Arc` snapshot; writers swap the `Arc` wholesale, so a
//! reader never observes a half-written descriptor.

use anyhow::{Context, Result};
use skilltune_types::{SkillDescriptor, TuneError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::lint::lint_descriptor;
use crate::skill::{Skill, SKILL_FILE};

/// Registered skill descriptors keyed by name
#[derive(Debug)]
pub struct DescriptorStore {
    descriptors: RwLock<HashMap<String, Arc<SkillDescriptor>>>,
    /// Skills directories to scan, highest priority first
    directories: Vec<PathBuf>,
}

impl DescriptorStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            descriptors: RwLock::new(HashMap::new()),
            directories: Vec::new(),
        }
    }

    /// Add a skills directory to scan
    pub fn add_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Scan all configured directories and register every valid skill.
    /// Earlier directories win on name clashes.
    pub fn discover(&mut self) -> Result<usize> {
        info!(
            "Starting skills discovery in {} directories",
            self.directories.len()
        );

        let directories = self.directories.clone();

        for dir in &directories {
            if !dir.exists() {
                debug!("Skills directory does not exist: {:?}", dir);
                continue;
            }

            if !dir.is_dir() {
                warn!("Skills path is not a directory: {:?}", dir);
                continue;
            }

            self.scan_directory(dir)?;
        }

        let count = self.descriptors.get_mut().len();
        info!("Discovered {} skills", count);
        Ok(count)
    }

    /// Scan a single directory for skill folders
    fn scan_directory(&mut self, dir: &Path) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {:?}", dir))?;

        let descriptors = self.descriptors.get_mut();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if !path.is_dir() || !path.join(SKILL_FILE).exists() {
                continue;
            }

            let skill = match Skill::from_path(&path) {
                Ok(skill) => skill,
                Err(e) => {
                    debug!("Skipping {:?}: {:#}", path, e);
                    continue;
                }
            };

            let report = lint_descriptor(&skill.descriptor);
            if !report.passed() {
                warn!("Skipping skill at {:?}: {}", path, report.to_string().trim());
                continue;
            }

            let name = skill.name().to_string();
            if descriptors.contains_key(&name) {
                debug!(
                    "Skill '{}' already loaded from a higher-priority directory, skipping {:?}",
                    name, path
                );
                continue;
            }

            debug!("Discovered skill: {} at {:?}", name, path);
            descriptors.insert(name, Arc::new(skill.descriptor));
        }

        Ok(())
    }

    /// Every SKILL.md under the configured directories, in priority order,
    /// including files that fail to parse or lint
    pub fn skill_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in &self.directories {
            let Ok(entries) = std::fs::read_dir(dir) else {
                debug!("Skipping unreadable skills directory {:?}", dir);
                continue;
            };

            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path().join(SKILL_FILE))
                .filter(|file| file.is_file())
                .collect();
            found.sort();
            files.extend(found);
        }
        files
    }

    /// Find the SKILL.md for `name` even when the skill was not registered.
    ///
    /// Matches the frontmatter name first, then the folder name, so a skill
    /// whose frontmatter does not parse can still be found.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let files = self.skill_files();
        let by_frontmatter = files.iter().find(|file| {
            Skill::from_path(file)
                .map(|skill| skill.name() == name)
                .unwrap_or(false)
        });

        by_frontmatter
            .or_else(|| {
                files.iter().find(|file| {
                    file.parent()
                        .and_then(Path::file_name)
                        .is_some_and(|folder| folder == name)
                })
            })
            .cloned()
    }

    /// Register or replace a descriptor. Rejects descriptors with lint errors.
    pub async fn put(&self, descriptor: SkillDescriptor) -> Result<Arc<SkillDescriptor>, TuneError> {
        check_lint(&descriptor)?;
        let descriptor = Arc::new(descriptor);
        self.descriptors
            .write()
            .await
            .insert(descriptor.name.clone(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Snapshot of a descriptor by name
    pub async fn get(&self, name: &str) -> Result<Arc<SkillDescriptor>, TuneError> {
        self.descriptors
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| TuneError::DescriptorNotFound(name.to_string()))
    }

    /// Replace the description of a registered skill
    pub async fn update(
        &self,
        name: &str,
        new_description: impl Into<String>,
    ) -> Result<Arc<SkillDescriptor>, TuneError> {
        let mut descriptors = self.descriptors.write().await;
        let current = descriptors
            .get(name)
            .ok_or_else(|| TuneError::DescriptorNotFound(name.to_string()))?;

        let updated = current.with_description(new_description);
        check_lint(&updated)?;

        let updated = Arc::new(updated);
        descriptors.insert(name.to_string(), Arc::clone(&updated));
        debug!("Updated descriptor '{}'", name);
        Ok(updated)
    }

    /// All skill names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.descriptors.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get number of skills
    pub async fn len(&self) -> usize {
        self.descriptors.read().await.len()
    }

    /// Check if store is empty
    pub async fn is_empty(&self) -> bool {
        self.descriptors.read().await.is_empty()
    }

    /// One `- name: description` line per skill, sorted by name
    pub async fn generate_skills_list(&self) -> String {
        let descriptors = self.descriptors.read().await;
        if descriptors.is_empty() {
            return "No skills available".to_string();
        }

        let mut sorted: Vec<_> = descriptors.values().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        sorted
            .iter()
            .map(|d| d.to_summary())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for DescriptorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_lint(descriptor: &SkillDescriptor) -> Result<(), TuneError> {
    let report = lint_descriptor(descriptor);
    for warning in report.warnings() {
        warn!("Skill '{}': {}", descriptor.name, warning.message);
    }
    if let Some(error) = report.errors().next() {
        return Err(TuneError::InvalidDescriptor {
            name: descriptor.name.clone(),
            reason: error.message.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tweet_writer() -> SkillDescriptor {
        SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets.",
        )
    }

    fn write_skill(root: &Path, folder: &str, name: &str, description: &str) {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(SKILL_FILE),
            format!("---\nname: {name}\ndescription: {description}\n---\n\n# {name}\n"),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_store_new() {
        let store = DescriptorStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.len().await, 0);
        assert_eq!(store.generate_skills_list().await, "No skills available");
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let store = DescriptorStore::new();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, TuneError::DescriptorNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let store = DescriptorStore::new();
        let err = store.update("missing", "anything").await.unwrap_err();
        assert!(matches!(err, TuneError::DescriptorNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_swaps_snapshot() {
        let store = DescriptorStore::new();
        store.put(tweet_writer()).await.unwrap();

        let before = store.get("tweet-writer").await.unwrap();
        store
            .update("tweet-writer", "Drafts tweets. Use when writing for X.")
            .await
            .unwrap();
        let after = store.get("tweet-writer").await.unwrap();

        // the old snapshot is untouched
        assert_eq!(before.description, tweet_writer().description);
        assert_eq!(after.description, "Drafts tweets. Use when writing for X.");
    }

    #[tokio::test]
    async fn test_put_rejects_lint_errors() {
        let store = DescriptorStore::new();
        let err = store
            .put(SkillDescriptor::new("Bad_Name", "Does things. Use when asked."))
            .await
            .unwrap_err();
        assert!(matches!(err, TuneError::InvalidDescriptor { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_discover_first_directory_wins() {
        let high = tempfile::tempdir().unwrap();
        let low = tempfile::tempdir().unwrap();
        write_skill(high.path(), "tweets", "tweet-writer", "High priority. Use when tweeting.");
        write_skill(low.path(), "tweets", "tweet-writer", "Low priority. Use when tweeting.");
        write_skill(low.path(), "blog", "blog-writer", "Writes blog posts. Use when blogging.");
        write_skill(low.path(), "broken", "Broken Name", "Invalid. Use when never.");
        fs::create_dir_all(low.path().join("no-skill-file")).unwrap();

        let mut store = DescriptorStore::new()
            .add_directory(high.path())
            .add_directory(low.path())
            .add_directory("/definitely/not/here");
        let count = store.discover().unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.names().await, vec!["blog-writer", "tweet-writer"]);
        let tweet = store.get("tweet-writer").await.unwrap();
        assert_eq!(tweet.description, "High priority. Use when tweeting.");

        let list = store.generate_skills_list().await;
        assert!(list.starts_with("- blog-writer: "));
    }

    #[test]
    fn test_locate_finds_unregistered_skills() {
        let root = tempfile::tempdir().unwrap();
        write_skill(root.path(), "tweets", "tweet-writer", "Drafts tweets. Use when tweeting.");
        write_skill(root.path(), "broken", "Broken Name", "Invalid. Use when never.");
        let half_done = root.path().join("half-done");
        fs::create_dir_all(&half_done).unwrap();
        fs::write(half_done.join(SKILL_FILE), "# no frontmatter\n").unwrap();

        let store = DescriptorStore::new().add_directory(root.path());
        assert_eq!(store.skill_files().len(), 3);
        assert_eq!(
            store.locate("tweet-writer"),
            Some(root.path().join("tweets").join(SKILL_FILE))
        );
        assert_eq!(
            store.locate("Broken Name"),
            Some(root.path().join("broken").join(SKILL_FILE))
        );
        assert_eq!(
            store.locate("half-done"),
            Some(half_done.join(SKILL_FILE))
        );
        assert_eq!(store.locate("missing"), None);
    }
}
