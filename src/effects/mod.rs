//! Effects-as-data for GitHub operations.
//!
//! This module defines effect types that describe operations without executing them.
//! This enables:
//! - Testability via mock interpreters
//! - Logging/tracing of intended operations
//! - Dry runs that perform reads and only log writes

pub mod dry_run;
pub mod github;
pub mod interpreter;
pub mod ops;

pub use dry_run::DryRunInterpreter;
pub use github::{
    ChangedFile, CheckRunData, GitHubEffect, GitHubResponse, LabelData, PrData, ReviewData,
    ReviewState, UserData,
};
pub use interpreter::GitHubInterpreter;
pub use ops::EffectError;
