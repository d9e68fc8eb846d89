//! PR Steward - CODEOWNERS-driven pull request automation for GitHub.
//!
//! Resolves the owners of a PR's changed files from a CODEOWNERS file,
//! requests their reviews, labels PRs by path and size, and posts
//! once-only Slack notifications guarded by label markers on the PR.

pub mod automations;
pub mod cli;
pub mod codeowners;
pub mod config;
pub mod dispatch;
pub mod effects;
pub mod event;
pub mod gate;
pub mod github;
pub mod notify;
pub mod types;

#[cfg(test)]
pub mod test_utils;
