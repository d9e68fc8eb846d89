//! Core domain types.
//!
//! Identifiers are newtypes so that a comment ID cannot be passed where a PR
//! number is expected, and owner references are normalized once at the edge.

pub mod identity;
pub mod ids;

pub use identity::{Identity, OwnerSet};
pub use ids::{CommentId, InvalidRepoId, InvalidSha, PrNumber, RepoId, Sha};
