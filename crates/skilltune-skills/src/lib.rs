//! Skilltune Skills
//!
//! Loads skill descriptors from SKILL.md frontmatter, lints them, and keeps
//! them in a [`DescriptorStore`] that the tuning loop updates between
//! evaluation rounds.
//!
//! ## Layout
//!
//! - Each skill is a folder containing SKILL.md with `name` and `description`
//!   in YAML frontmatter
//! - Multiple skills directories (personal, project, explicit)
//! - Only the descriptor is used for trigger matching; the body, its
//!   reference files and the folder contents are linted

#![deny(unsafe_code, dead_code, unused_imports, unused_variables, missing_docs)]

pub mod lint;
pub mod skill;
pub mod store;

pub use lint::{lint_descriptor, lint_path, lint_skill, LintFinding, LintReport, Severity};
pub use skill::Skill;
pub use store::DescriptorStore;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{lint_descriptor, lint_path, DescriptorStore, LintReport, Skill};
}
