//! Typed helpers over [`GitHubInterpreter`].
//!
//! Each helper issues one effect and unpacks the matching response variant,
//! so callers work with plain data instead of matching on `GitHubResponse`.

use thiserror::Error;

use crate::types::{CommentId, PrNumber, Sha};

use super::github::{
    ChangedFile, CheckRunData, GitHubEffect, GitHubResponse, LabelData, PrData, ReviewData,
    UserData,
};
use super::interpreter::GitHubInterpreter;

/// Errors from executing a single effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    /// The interpreter reported a failure.
    #[error("{effect} failed: {message}")]
    GitHub {
        effect: &'static str,
        message: String,
    },

    /// The interpreter answered with the wrong response variant.
    #[error("{effect} returned an unexpected {got} response")]
    UnexpectedResponse {
        effect: &'static str,
        got: &'static str,
    },
}

impl EffectError {
    /// Name of the effect that failed.
    pub fn effect(&self) -> &'static str {
        match self {
            EffectError::GitHub { effect, .. } | EffectError::UnexpectedResponse { effect, .. } => {
                effect
            }
        }
    }
}

async fn run<G: GitHubInterpreter>(
    github: &G,
    effect: GitHubEffect,
) -> Result<(&'static str, GitHubResponse), EffectError> {
    let name = effect.name();
    match github.interpret(effect).await {
        Ok(response) => Ok((name, response)),
        Err(e) => Err(EffectError::GitHub {
            effect: name,
            message: e.to_string(),
        }),
    }
}

fn unexpected(effect: &'static str, response: &GitHubResponse) -> EffectError {
    EffectError::UnexpectedResponse {
        effect,
        got: response.kind(),
    }
}

// ─── Reads ────────────────────────────────────────────────────────────────────

pub async fn get_pr<G: GitHubInterpreter>(github: &G, pr: PrNumber) -> Result<PrData, EffectError> {
    match run(github, GitHubEffect::GetPr { pr }).await? {
        (_, GitHubResponse::Pr(data)) => Ok(data),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn list_open_prs<G: GitHubInterpreter>(github: &G) -> Result<Vec<PrData>, EffectError> {
    match run(github, GitHubEffect::ListOpenPrs).await? {
        (_, GitHubResponse::PrList(prs)) => Ok(prs),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn list_changed_files<G: GitHubInterpreter>(
    github: &G,
    pr: PrNumber,
) -> Result<Vec<ChangedFile>, EffectError> {
    match run(github, GitHubEffect::ListChangedFiles { pr }).await? {
        (_, GitHubResponse::ChangedFiles(files)) => Ok(files),
        (name, other) => Err(unexpected(name, &other)),
    }
}

/// Returns the file's text, or `None` if it does not exist at that ref.
pub async fn get_file_contents<G: GitHubInterpreter>(
    github: &G,
    path: &str,
    git_ref: Option<&str>,
) -> Result<Option<String>, EffectError> {
    let effect = GitHubEffect::GetFileContents {
        path: path.to_string(),
        git_ref: git_ref.map(String::from),
    };
    match run(github, effect).await? {
        (_, GitHubResponse::FileContents(text)) => Ok(text),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn list_labels<G: GitHubInterpreter>(
    github: &G,
    target: PrNumber,
) -> Result<Vec<String>, EffectError> {
    match run(github, GitHubEffect::ListLabels { target }).await? {
        (_, GitHubResponse::Labels(labels)) => Ok(labels),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn list_repo_labels<G: GitHubInterpreter>(
    github: &G,
) -> Result<Vec<LabelData>, EffectError> {
    match run(github, GitHubEffect::ListRepoLabels).await? {
        (_, GitHubResponse::RepoLabels(labels)) => Ok(labels),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn list_reviews<G: GitHubInterpreter>(
    github: &G,
    pr: PrNumber,
) -> Result<Vec<ReviewData>, EffectError> {
    match run(github, GitHubEffect::ListReviews { pr }).await? {
        (_, GitHubResponse::Reviews(reviews)) => Ok(reviews),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn list_check_runs<G: GitHubInterpreter>(
    github: &G,
    sha: &Sha,
) -> Result<Vec<CheckRunData>, EffectError> {
    match run(github, GitHubEffect::ListCheckRuns { sha: sha.clone() }).await? {
        (_, GitHubResponse::CheckRuns(runs)) => Ok(runs),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn get_user<G: GitHubInterpreter>(
    github: &G,
    login: &str,
) -> Result<UserData, EffectError> {
    let effect = GitHubEffect::GetUser {
        login: login.to_string(),
    };
    match run(github, effect).await? {
        (_, GitHubResponse::User(user)) => Ok(user),
        (name, other) => Err(unexpected(name, &other)),
    }
}

// ─── Writes ───────────────────────────────────────────────────────────────────

pub async fn add_labels<G: GitHubInterpreter>(
    github: &G,
    target: PrNumber,
    labels: Vec<String>,
) -> Result<(), EffectError> {
    match run(github, GitHubEffect::AddLabels { target, labels }).await? {
        (_, GitHubResponse::LabelsAdded) => Ok(()),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn remove_label<G: GitHubInterpreter>(
    github: &G,
    target: PrNumber,
    label: &str,
) -> Result<(), EffectError> {
    let effect = GitHubEffect::RemoveLabel {
        target,
        label: label.to_string(),
    };
    match run(github, effect).await? {
        (_, GitHubResponse::LabelRemoved) => Ok(()),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn create_label<G: GitHubInterpreter>(
    github: &G,
    name: &str,
    color: &str,
    description: Option<&str>,
) -> Result<(), EffectError> {
    let effect = GitHubEffect::CreateLabel {
        name: name.to_string(),
        color: color.to_string(),
        description: description.map(String::from),
    };
    match run(github, effect).await? {
        (_, GitHubResponse::LabelCreated) => Ok(()),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn update_label_color<G: GitHubInterpreter>(
    github: &G,
    name: &str,
    color: &str,
) -> Result<(), EffectError> {
    let effect = GitHubEffect::UpdateLabelColor {
        name: name.to_string(),
        color: color.to_string(),
    };
    match run(github, effect).await? {
        (_, GitHubResponse::LabelUpdated) => Ok(()),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn post_comment<G: GitHubInterpreter>(
    github: &G,
    target: PrNumber,
    body: String,
) -> Result<CommentId, EffectError> {
    match run(github, GitHubEffect::PostComment { target, body }).await? {
        (_, GitHubResponse::CommentPosted { id }) => Ok(id),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn request_reviewers<G: GitHubInterpreter>(
    github: &G,
    pr: PrNumber,
    reviewers: Vec<String>,
    team_reviewers: Vec<String>,
) -> Result<(), EffectError> {
    let effect = GitHubEffect::RequestReviewers {
        pr,
        reviewers,
        team_reviewers,
    };
    match run(github, effect).await? {
        (_, GitHubResponse::ReviewersRequested) => Ok(()),
        (name, other) => Err(unexpected(name, &other)),
    }
}

pub async fn add_assignees<G: GitHubInterpreter>(
    github: &G,
    target: PrNumber,
    assignees: Vec<String>,
) -> Result<(), EffectError> {
    match run(github, GitHubEffect::AddAssignees { target, assignees }).await? {
        (_, GitHubResponse::AssigneesAdded) => Ok(()),
        (name, other) => Err(unexpected(name, &other)),
    }
}
