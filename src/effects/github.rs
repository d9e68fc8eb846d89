//! GitHub API effect types.
//!
//! These types describe GitHub API operations as data, without executing them.
//! The octocrab interpreter in [`crate::github`] executes them against the
//! real API; tests use a recording mock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CommentId, PrNumber, Sha};

/// A GitHub API effect.
///
/// Effects are repo-scoped: the interpreter is constructed with a `RepoId`,
/// so effects don't include it. Issues and pull requests share the `target`
/// number space for labels, comments and assignees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Reads ────────────────────────────────────────────────────────────────
    /// Fetch a single PR by number.
    GetPr { pr: PrNumber },

    /// List all open PRs in the repository.
    ListOpenPrs,

    /// List the files changed by a PR.
    ListChangedFiles { pr: PrNumber },

    /// Fetch a file's text. `git_ref` defaults to the default branch.
    GetFileContents {
        path: String,
        git_ref: Option<String>,
    },

    /// List the labels currently on an issue or PR.
    ListLabels { target: PrNumber },

    /// List every label defined in the repository.
    ListRepoLabels,

    /// List submitted reviews on a PR.
    ListReviews { pr: PrNumber },

    /// List check runs for a commit.
    ListCheckRuns { sha: Sha },

    /// Fetch a user's public profile.
    GetUser { login: String },

    // ─── Writes ───────────────────────────────────────────────────────────────
    /// Add labels to an issue or PR. Adding a label that is already present
    /// is a no-op on GitHub's side.
    AddLabels { target: PrNumber, labels: Vec<String> },

    /// Remove one label from an issue or PR.
    RemoveLabel { target: PrNumber, label: String },

    /// Create a repository label.
    CreateLabel {
        name: String,
        color: String,
        description: Option<String>,
    },

    /// Change an existing repository label's colour.
    UpdateLabelColor { name: String, color: String },

    /// Post a new comment on an issue or PR.
    PostComment { target: PrNumber, body: String },

    /// Request reviews from users and/or teams.
    RequestReviewers {
        pr: PrNumber,
        reviewers: Vec<String>,
        team_reviewers: Vec<String>,
    },

    /// Add assignees to an issue or PR.
    AddAssignees {
        target: PrNumber,
        assignees: Vec<String>,
    },
}

impl GitHubEffect {
    /// Returns true for effects that only read state.
    ///
    /// Only reads are retried on transient failure. Writes run once: a
    /// retried comment creation could post the comment twice.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            GitHubEffect::GetPr { .. }
                | GitHubEffect::ListOpenPrs
                | GitHubEffect::ListChangedFiles { .. }
                | GitHubEffect::GetFileContents { .. }
                | GitHubEffect::ListLabels { .. }
                | GitHubEffect::ListRepoLabels
                | GitHubEffect::ListReviews { .. }
                | GitHubEffect::ListCheckRuns { .. }
                | GitHubEffect::GetUser { .. }
        )
    }

    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            GitHubEffect::GetPr { .. } => "get_pr",
            GitHubEffect::ListOpenPrs => "list_open_prs",
            GitHubEffect::ListChangedFiles { .. } => "list_changed_files",
            GitHubEffect::GetFileContents { .. } => "get_file_contents",
            GitHubEffect::ListLabels { .. } => "list_labels",
            GitHubEffect::ListRepoLabels => "list_repo_labels",
            GitHubEffect::ListReviews { .. } => "list_reviews",
            GitHubEffect::ListCheckRuns { .. } => "list_check_runs",
            GitHubEffect::GetUser { .. } => "get_user",
            GitHubEffect::AddLabels { .. } => "add_labels",
            GitHubEffect::RemoveLabel { .. } => "remove_label",
            GitHubEffect::CreateLabel { .. } => "create_label",
            GitHubEffect::UpdateLabelColor { .. } => "update_label_color",
            GitHubEffect::PostComment { .. } => "post_comment",
            GitHubEffect::RequestReviewers { .. } => "request_reviewers",
            GitHubEffect::AddAssignees { .. } => "add_assignees",
        }
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// PR data returned from the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrData {
    pub number: PrNumber,
    pub title: String,
    pub html_url: String,
    /// Login of the PR author.
    pub author: String,
    pub head_ref: String,
    pub head_sha: Sha,
    pub created_at: DateTime<Utc>,
    pub is_draft: bool,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    /// Logins of users whose review is currently requested.
    pub requested_reviewers: Vec<String>,
}

/// A file changed by a PR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
}

impl ChangedFile {
    /// A changed file with no line statistics.
    pub fn new(path: impl Into<String>) -> Self {
        ChangedFile {
            path: path.into(),
            additions: 0,
            deletions: 0,
        }
    }
}

/// State of a submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// A submitted review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewData {
    pub reviewer: String,
    pub state: ReviewState,
}

/// A check run on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunData {
    pub name: String,
    /// `queued`, `in_progress` or `completed`.
    pub status: String,
    /// Set once completed: `success`, `failure`, `neutral`, ...
    pub conclusion: Option<String>,
}

impl CheckRunData {
    /// Returns true if the run completed successfully.
    pub fn succeeded(&self) -> bool {
        self.status == "completed" && self.conclusion.as_deref() == Some("success")
    }
}

/// A repository label definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelData {
    pub name: String,
    /// Six hex digits, no leading `#`.
    pub color: String,
}

/// A user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub login: String,
    pub avatar_url: Option<String>,
}

/// Response from a GitHub effect.
///
/// Each variant corresponds to the response from a particular effect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Response to `GetPr`.
    Pr(PrData),

    /// Response to `ListOpenPrs`.
    PrList(Vec<PrData>),

    /// Response to `ListChangedFiles`.
    ChangedFiles(Vec<ChangedFile>),

    /// Response to `GetFileContents`. `None` when the file does not exist.
    FileContents(Option<String>),

    /// Response to `ListLabels`.
    Labels(Vec<String>),

    /// Response to `ListRepoLabels`.
    RepoLabels(Vec<LabelData>),

    /// Response to `ListReviews`.
    Reviews(Vec<ReviewData>),

    /// Response to `ListCheckRuns`.
    CheckRuns(Vec<CheckRunData>),

    /// Response to `GetUser`.
    User(UserData),

    /// Response to `AddLabels`.
    LabelsAdded,

    /// Response to `RemoveLabel`.
    LabelRemoved,

    /// Response to `CreateLabel`.
    LabelCreated,

    /// Response to `UpdateLabelColor`.
    LabelUpdated,

    /// Response to `PostComment`.
    CommentPosted {
        /// The ID of the newly created comment.
        id: CommentId,
    },

    /// Response to `RequestReviewers`.
    ReviewersRequested,

    /// Response to `AddAssignees`.
    AssigneesAdded,
}

impl GitHubResponse {
    /// Variant name, for "unexpected response" errors.
    pub fn kind(&self) -> &'static str {
        match self {
            GitHubResponse::Pr(_) => "pr",
            GitHubResponse::PrList(_) => "pr_list",
            GitHubResponse::ChangedFiles(_) => "changed_files",
            GitHubResponse::FileContents(_) => "file_contents",
            GitHubResponse::Labels(_) => "labels",
            GitHubResponse::RepoLabels(_) => "repo_labels",
            GitHubResponse::Reviews(_) => "reviews",
            GitHubResponse::CheckRuns(_) => "check_runs",
            GitHubResponse::User(_) => "user",
            GitHubResponse::LabelsAdded => "labels_added",
            GitHubResponse::LabelRemoved => "label_removed",
            GitHubResponse::LabelCreated => "label_created",
            GitHubResponse::LabelUpdated => "label_updated",
            GitHubResponse::CommentPosted { .. } => "comment_posted",
            GitHubResponse::ReviewersRequested => "reviewers_requested",
            GitHubResponse::AssigneesAdded => "assignees_added",
        }
    }
}
