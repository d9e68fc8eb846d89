//! GitHub effect interpreter using octocrab.
//!
//! This module implements the `GitHubInterpreter` trait, executing GitHub effects
//! against the real GitHub API via octocrab.
//!
//! Key implementation details:
//! - REST endpoints are called through octocrab's raw `get`/`post`/`patch`/`delete`
//!   with small local response types, so only the fields we use are decoded
//! - List endpoints paginate at 100 items per page
//! - Reads retry transient errors with exponential backoff; writes run once
//! - A missing file (HTTP 404) is a successful `FileContents(None)`, not an error

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::effects::{
    ChangedFile, CheckRunData, GitHubEffect, GitHubInterpreter, GitHubResponse, LabelData, PrData,
    ReviewData, ReviewState, UserData,
};
use crate::types::{CommentId, PrNumber, Sha};

use super::client::OctocrabClient;
use super::error::GitHubApiError;
use super::retry::{RetryConfig, RetryPolicy, retry_with_backoff};

const PER_PAGE: u32 = 100;

/// GitHub caps the PR files listing at 3000 entries.
const MAX_FILE_PAGES: u32 = 30;

// ─── Interpreter Implementation ───────────────────────────────────────────────

impl GitHubInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        let policy = RetryPolicy::for_effect(&effect);
        interpret_github_effect(self, effect, RetryConfig::DEFAULT, policy).await
    }
}

/// Executes `effect` against the API, retrying reads as `retry_policy`
/// allows.
pub async fn interpret_github_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
    retry_config: RetryConfig,
    retry_policy: RetryPolicy,
) -> Result<GitHubResponse, GitHubApiError> {
    tracing::debug!(effect = effect.name(), "Executing GitHub effect");
    retry_with_backoff(retry_config, retry_policy, || {
        execute_effect(client, effect.clone())
    })
    .await
}

/// Executes a single effect without retry logic.
async fn execute_effect(
    client: &OctocrabClient,
    effect: GitHubEffect,
) -> Result<GitHubResponse, GitHubApiError> {
    match effect {
        GitHubEffect::GetPr { pr } => get_pr(client, pr).await,
        GitHubEffect::ListOpenPrs => list_open_prs(client).await,
        GitHubEffect::ListChangedFiles { pr } => list_changed_files(client, pr).await,
        GitHubEffect::GetFileContents { path, git_ref } => {
            get_file_contents(client, path, git_ref).await
        }
        GitHubEffect::ListLabels { target } => list_labels(client, target).await,
        GitHubEffect::ListRepoLabels => list_repo_labels(client).await,
        GitHubEffect::ListReviews { pr } => list_reviews(client, pr).await,
        GitHubEffect::ListCheckRuns { sha } => list_check_runs(client, sha).await,
        GitHubEffect::GetUser { login } => get_user(client, login).await,
        GitHubEffect::AddLabels { target, labels } => add_labels(client, target, labels).await,
        GitHubEffect::RemoveLabel { target, label } => remove_label(client, target, label).await,
        GitHubEffect::CreateLabel {
            name,
            color,
            description,
        } => create_label(client, name, color, description).await,
        GitHubEffect::UpdateLabelColor { name, color } => {
            update_label_color(client, name, color).await
        }
        GitHubEffect::PostComment { target, body } => post_comment(client, target, body).await,
        GitHubEffect::RequestReviewers {
            pr,
            reviewers,
            team_reviewers,
        } => request_reviewers(client, pr, reviewers, team_reviewers).await,
        GitHubEffect::AddAssignees { target, assignees } => {
            add_assignees(client, target, assignees).await
        }
    }
}

fn repo_url(client: &OctocrabClient, rest: &str) -> String {
    format!("/repos/{}/{}/{}", client.owner(), client.repo_name(), rest)
}

#[derive(Serialize)]
struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
    per_page: u32,
    page: u32,
}

/// Fetches every page of a plain-array list endpoint.
async fn paginate<T: DeserializeOwned>(
    client: &OctocrabClient,
    url: &str,
    state: Option<&'static str>,
    max_pages: Option<u32>,
) -> Result<Vec<T>, GitHubApiError> {
    let mut page = 1u32;
    let mut all = Vec::new();

    loop {
        let params = PageParams {
            state,
            per_page: PER_PAGE,
            page,
        };
        let items: Vec<T> = client
            .inner()
            .get(url, Some(&params))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        let is_last_page = items.len() < PER_PAGE as usize;
        all.extend(items);

        if is_last_page {
            break;
        }
        if max_pages.is_some_and(|max| page >= max) {
            tracing::warn!(url, pages = page, "Hit pagination limit; results may be incomplete");
            break;
        }
        page += 1;
    }

    Ok(all)
}

// ─── Raw REST Types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
    #[serde(default)]
    color: String,
}

#[derive(Debug, Deserialize)]
struct RawHead {
    #[serde(rename = "ref")]
    ref_field: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RawPull {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html_url: String,
    user: Option<RawUser>,
    head: RawHead,
    created_at: DateTime<Utc>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    assignees: Vec<RawUser>,
    #[serde(default)]
    requested_reviewers: Vec<RawUser>,
}

impl RawPull {
    fn into_pr_data(self) -> Result<PrData, GitHubApiError> {
        let head_sha = Sha::parse(&self.head.sha).map_err(|e| {
            GitHubApiError::permanent_without_source(format!(
                "Invalid head SHA on PR #{}: {}",
                self.number, e
            ))
        })?;

        Ok(PrData {
            number: PrNumber(self.number),
            title: self.title,
            html_url: self.html_url,
            author: self.user.map(|u| u.login).unwrap_or_default(),
            head_ref: self.head.ref_field,
            head_sha,
            created_at: self.created_at,
            is_draft: self.draft,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            assignees: self.assignees.into_iter().map(|u| u.login).collect(),
            requested_reviewers: self
                .requested_reviewers
                .into_iter()
                .map(|u| u.login)
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawFile {
    filename: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    user: Option<RawUser>,
    state: ReviewState,
}

#[derive(Debug, Deserialize)]
struct RawCheckRun {
    name: String,
    status: String,
    conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCheckRunPage {
    check_runs: Vec<RawCheckRun>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    login: String,
    avatar_url: Option<String>,
}

// ─── PR Operations ────────────────────────────────────────────────────────────

async fn get_pr(client: &OctocrabClient, pr: PrNumber) -> Result<GitHubResponse, GitHubApiError> {
    let url = repo_url(client, &format!("pulls/{}", pr.0));
    let pull: RawPull = client
        .inner()
        .get(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::Pr(pull.into_pr_data()?))
}

async fn list_open_prs(client: &OctocrabClient) -> Result<GitHubResponse, GitHubApiError> {
    let url = repo_url(client, "pulls");
    let pulls: Vec<RawPull> = paginate(client, &url, Some("open"), None).await?;

    let mut prs = Vec::with_capacity(pulls.len());
    for pull in pulls {
        let number = pull.number;
        match pull.into_pr_data() {
            Ok(data) => prs.push(data),
            Err(e) => tracing::warn!(pr = number, error = %e, "Skipping PR with invalid data"),
        }
    }

    Ok(GitHubResponse::PrList(prs))
}

async fn list_changed_files(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = repo_url(client, &format!("pulls/{}/files", pr.0));
    let files: Vec<RawFile> = paginate(client, &url, None, Some(MAX_FILE_PAGES)).await?;

    Ok(GitHubResponse::ChangedFiles(
        files
            .into_iter()
            .map(|f| ChangedFile {
                path: f.filename,
                additions: f.additions,
                deletions: f.deletions,
            })
            .collect(),
    ))
}

async fn list_reviews(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = repo_url(client, &format!("pulls/{}/reviews", pr.0));
    let reviews: Vec<RawReview> = paginate(client, &url, None, None).await?;

    Ok(GitHubResponse::Reviews(
        reviews
            .into_iter()
            .filter_map(|r| {
                r.user.map(|u| ReviewData {
                    reviewer: u.login,
                    state: r.state,
                })
            })
            .collect(),
    ))
}

async fn request_reviewers(
    client: &OctocrabClient,
    pr: PrNumber,
    reviewers: Vec<String>,
    team_reviewers: Vec<String>,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct ReviewRequest {
        reviewers: Vec<String>,
        team_reviewers: Vec<String>,
    }

    let url = repo_url(client, &format!("pulls/{}/requested_reviewers", pr.0));
    let _: serde_json::Value = client
        .inner()
        .post(
            &url,
            Some(&ReviewRequest {
                reviewers,
                team_reviewers,
            }),
        )
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::ReviewersRequested)
}

// ─── Repository Contents ──────────────────────────────────────────────────────

async fn get_file_contents(
    client: &OctocrabClient,
    path: String,
    git_ref: Option<String>,
) -> Result<GitHubResponse, GitHubApiError> {
    let repos = client.inner().repos(client.owner(), client.repo_name());
    let mut request = repos.get_content().path(&path);
    if let Some(git_ref) = &git_ref {
        request = request.r#ref(git_ref);
    }

    match request.send().await {
        Ok(contents) => {
            let text = contents
                .items
                .into_iter()
                .next()
                .and_then(|item| item.decoded_content());
            if text.is_none() {
                tracing::warn!(path = %path, "File exists but its content could not be decoded");
            }
            Ok(GitHubResponse::FileContents(text))
        }
        Err(e) => {
            let err = GitHubApiError::from_octocrab(e);
            if err.is_not_found() {
                tracing::debug!(path = %path, git_ref = ?git_ref, "File not found");
                Ok(GitHubResponse::FileContents(None))
            } else {
                Err(err)
            }
        }
    }
}

async fn list_check_runs(
    client: &OctocrabClient,
    sha: Sha,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = repo_url(client, &format!("commits/{}/check-runs", sha.as_str()));
    let mut page = 1u32;
    let mut runs = Vec::new();

    loop {
        let params = PageParams {
            state: None,
            per_page: PER_PAGE,
            page,
        };
        let result: RawCheckRunPage = client
            .inner()
            .get(&url, Some(&params))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        let is_last_page = result.check_runs.len() < PER_PAGE as usize;
        runs.extend(result.check_runs.into_iter().map(|r| CheckRunData {
            name: r.name,
            status: r.status,
            conclusion: r.conclusion,
        }));

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(GitHubResponse::CheckRuns(runs))
}

async fn get_user(client: &OctocrabClient, login: String) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!("/users/{}", urlencoding::encode(&login));
    let profile: RawProfile = client
        .inner()
        .get(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::User(UserData {
        login: profile.login,
        avatar_url: profile.avatar_url,
    }))
}

// ─── Labels ───────────────────────────────────────────────────────────────────

async fn list_labels(
    client: &OctocrabClient,
    target: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = repo_url(client, &format!("issues/{}/labels", target.0));
    let labels: Vec<RawLabel> = paginate(client, &url, None, None).await?;
    Ok(GitHubResponse::Labels(
        labels.into_iter().map(|l| l.name).collect(),
    ))
}

async fn list_repo_labels(client: &OctocrabClient) -> Result<GitHubResponse, GitHubApiError> {
    let url = repo_url(client, "labels");
    let labels: Vec<RawLabel> = paginate(client, &url, None, None).await?;
    Ok(GitHubResponse::RepoLabels(
        labels
            .into_iter()
            .map(|l| LabelData {
                name: l.name,
                color: l.color,
            })
            .collect(),
    ))
}

async fn add_labels(
    client: &OctocrabClient,
    target: PrNumber,
    labels: Vec<String>,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct AddLabelsRequest {
        labels: Vec<String>,
    }

    let url = repo_url(client, &format!("issues/{}/labels", target.0));
    let _: serde_json::Value = client
        .inner()
        .post(&url, Some(&AddLabelsRequest { labels }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::LabelsAdded)
}

async fn remove_label(
    client: &OctocrabClient,
    target: PrNumber,
    label: String,
) -> Result<GitHubResponse, GitHubApiError> {
    // Label names may contain spaces, slashes and colons.
    let url = repo_url(
        client,
        &format!("issues/{}/labels/{}", target.0, urlencoding::encode(&label)),
    );
    let _: serde_json::Value = client
        .inner()
        .delete(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::LabelRemoved)
}

async fn create_label(
    client: &OctocrabClient,
    name: String,
    color: String,
    description: Option<String>,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct CreateLabelRequest {
        name: String,
        color: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    }

    let url = repo_url(client, "labels");
    let _: serde_json::Value = client
        .inner()
        .post(
            &url,
            Some(&CreateLabelRequest {
                name,
                color,
                description,
            }),
        )
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::LabelCreated)
}

async fn update_label_color(
    client: &OctocrabClient,
    name: String,
    color: String,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct UpdateLabelRequest {
        color: String,
    }

    let url = repo_url(client, &format!("labels/{}", urlencoding::encode(&name)));
    let _: serde_json::Value = client
        .inner()
        .patch(&url, Some(&UpdateLabelRequest { color }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::LabelUpdated)
}

// ─── Comments and Assignees ───────────────────────────────────────────────────

async fn post_comment(
    client: &OctocrabClient,
    target: PrNumber,
    body: String,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .issues(client.owner(), client.repo_name())
        .create_comment(target.0, body)
        .await;

    match result {
        Ok(comment) => Ok(GitHubResponse::CommentPosted {
            id: CommentId(comment.id.into_inner()),
        }),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

async fn add_assignees(
    client: &OctocrabClient,
    target: PrNumber,
    assignees: Vec<String>,
) -> Result<GitHubResponse, GitHubApiError> {
    #[derive(Serialize)]
    struct AssigneesRequest {
        assignees: Vec<String>,
    }

    let url = repo_url(client, &format!("issues/{}/assignees", target.0));
    let _: serde_json::Value = client
        .inner()
        .post(&url, Some(&AssigneesRequest { assignees }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(GitHubResponse::AssigneesAdded)
}
