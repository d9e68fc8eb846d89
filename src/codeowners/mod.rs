//! CODEOWNERS parsing, matching and owner resolution.
//!
//! - [`pattern`] compiles ownership globs into matchers
//! - [`rules`] parses the ownership file into an ordered [`RuleSet`]
//! - [`resolver`] turns a rule set and changed paths into an [`OwnerSet`]
//! - [`labels`] derives PR labels from the same rules plus label filters
//!
//! [`OwnerSet`]: crate::types::OwnerSet

pub mod labels;
pub mod pattern;
pub mod resolver;
pub mod rules;

pub use labels::{LabelFilter, path_labels};
pub use pattern::{Pattern, PatternError, matches};
pub use resolver::{Resolution, common_owners, owners_for_path, resolve, resolve_outcome, without};
pub use rules::{DiagnosticKind, OwnershipRule, ParsedRules, RuleDiagnostic, RuleSet};

/// Default location of the ownership file, relative to the repository root.
pub const DEFAULT_CODEOWNERS_PATH: &str = "CODEOWNERS";
