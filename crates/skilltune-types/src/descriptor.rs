use serde::{Deserialize, Serialize};

/// The (name, description) pair used to decide whether a skill applies to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
}

impl SkillDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Copy of this descriptor with the description replaced wholesale
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            description: description.into(),
        }
    }

    /// Format: "- {name}: {description}"
    pub fn to_summary(&self) -> String {
        format!("- {}: {}", self.name, self.description)
    }
}
