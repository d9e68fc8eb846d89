//! Shared test utilities: a recording GitHub mock, a recording webhook sink,
//! and arbitrary generators for property-based testing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use crate::effects::{
    ChangedFile, CheckRunData, GitHubEffect, GitHubInterpreter, GitHubResponse, LabelData, PrData,
    ReviewData, ReviewState, UserData,
};
use crate::github::GitHubApiError;
use crate::notify::{WebhookError, WebhookPayload, WebhookSink};
use crate::types::{CommentId, PrNumber, Sha};

pub fn arb_pr_number() -> impl Strategy<Value = PrNumber> {
    (1u64..100_000).prop_map(PrNumber)
}

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn sha(c: char) -> Sha {
    Sha::parse(c.to_string().repeat(40)).unwrap()
}

/// A PR opened by `author` at `created_at`, with no labels or reviewers.
pub fn pr_data(number: u64, author: &str, created_at: DateTime<Utc>) -> PrData {
    PrData {
        number: PrNumber(number),
        title: format!("PR {}", number),
        html_url: format!("https://github.com/acme/widgets/pull/{}", number),
        author: author.to_string(),
        head_ref: format!("feature-{}", number),
        head_sha: sha('a'),
        created_at,
        is_draft: false,
        labels: vec![],
        assignees: vec![],
        requested_reviewers: vec![],
    }
}

// ─── MockGitHub ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockState {
    prs: BTreeMap<PrNumber, PrData>,
    changed_files: HashMap<PrNumber, Vec<ChangedFile>>,
    files: HashMap<String, String>,
    labels: HashMap<PrNumber, Vec<String>>,
    repo_labels: Vec<LabelData>,
    reviews: HashMap<PrNumber, Vec<ReviewData>>,
    check_runs: HashMap<Sha, Vec<Vec<CheckRunData>>>,
    users: HashMap<String, UserData>,
    comments: Vec<(PrNumber, String)>,
    assignees: HashMap<PrNumber, Vec<String>>,
    requested: HashMap<PrNumber, Vec<String>>,
    failures: HashMap<&'static str, u16>,
    rejected_reviewers: HashSet<String>,
    calls: Vec<GitHubEffect>,
    next_comment_id: u64,
}

/// An in-memory GitHub that records every effect and applies writes to its
/// own state, so later reads observe earlier writes.
///
/// Files are served for every ref. Failures are injected per effect name
/// with [`MockGitHub::failing`].
#[derive(Default)]
pub struct MockGitHub {
    state: Mutex<MockState>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, f: impl FnOnce(&mut MockState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_pr(self, pr: PrData) -> Self {
        self.with(|s| {
            s.labels.insert(pr.number, pr.labels.clone());
            s.prs.insert(pr.number, pr);
        })
    }

    pub fn with_files(self, pr: PrNumber, paths: &[&str]) -> Self {
        let files = paths.iter().map(|p| ChangedFile::new(*p)).collect();
        self.with_changed_files(pr, files)
    }

    pub fn with_changed_files(self, pr: PrNumber, files: Vec<ChangedFile>) -> Self {
        self.with(|s| {
            s.changed_files.insert(pr, files);
        })
    }

    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.with(|s| {
            s.files.insert(path.to_string(), contents.to_string());
        })
    }

    pub fn with_labels(self, target: PrNumber, labels: &[&str]) -> Self {
        self.with(|s| {
            s.labels
                .insert(target, labels.iter().map(|l| l.to_string()).collect());
        })
    }

    pub fn with_repo_label(self, name: &str, color: &str) -> Self {
        self.with(|s| {
            s.repo_labels.push(LabelData {
                name: name.to_string(),
                color: color.to_string(),
            });
        })
    }

    pub fn with_review(self, pr: PrNumber, reviewer: &str, state: ReviewState) -> Self {
        self.with(|s| {
            s.reviews.entry(pr).or_default().push(ReviewData {
                reviewer: reviewer.to_string(),
                state,
            });
        })
    }

    /// Queues one `ListCheckRuns` answer; the last queued answer repeats.
    pub fn with_check_runs(self, sha: &Sha, runs: Vec<CheckRunData>) -> Self {
        self.with(|s| {
            s.check_runs.entry(sha.clone()).or_default().push(runs);
        })
    }

    pub fn with_user(self, login: &str, avatar_url: &str) -> Self {
        self.with(|s| {
            s.users.insert(
                login.to_string(),
                UserData {
                    login: login.to_string(),
                    avatar_url: Some(avatar_url.to_string()),
                },
            );
        })
    }

    /// Makes every effect with this name fail with the given HTTP status.
    pub fn failing(self, effect_name: &'static str, status: u16) -> Self {
        self.with(|s| {
            s.failures.insert(effect_name, status);
        })
    }

    /// Makes review requests naming this login fail with HTTP 422.
    pub fn rejecting_reviewer(self, login: &str) -> Self {
        self.with(|s| {
            s.rejected_reviewers.insert(login.to_string());
        })
    }

    pub fn calls(&self) -> Vec<GitHubEffect> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Recorded effects that are not reads.
    pub fn writes(&self) -> Vec<GitHubEffect> {
        self.calls().into_iter().filter(|e| !e.is_read()).collect()
    }

    pub fn labels_on(&self, target: PrNumber) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .labels
            .get(&target)
            .cloned()
            .unwrap_or_default()
    }

    pub fn repo_labels(&self) -> Vec<LabelData> {
        self.state.lock().unwrap().repo_labels.clone()
    }

    pub fn comments_on(&self, target: PrNumber) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn assignees_on(&self, target: PrNumber) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .assignees
            .get(&target)
            .cloned()
            .unwrap_or_default()
    }

    pub fn requested_on(&self, pr: PrNumber) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .requested
            .get(&pr)
            .cloned()
            .unwrap_or_default()
    }

    fn apply(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(effect.clone());

        if let Some(status) = s.failures.get(effect.name()) {
            return Err(GitHubApiError::with_status(
                *status,
                format!("injected failure for {}", effect.name()),
            ));
        }

        let not_found = |what: String| GitHubApiError::with_status(404, what);

        let response = match effect {
            GitHubEffect::GetPr { pr } => GitHubResponse::Pr(
                s.prs
                    .get(&pr)
                    .cloned()
                    .ok_or_else(|| not_found(format!("PR {}", pr)))?,
            ),
            GitHubEffect::ListOpenPrs => GitHubResponse::PrList(s.prs.values().cloned().collect()),
            GitHubEffect::ListChangedFiles { pr } => GitHubResponse::ChangedFiles(
                s.changed_files.get(&pr).cloned().unwrap_or_default(),
            ),
            GitHubEffect::GetFileContents { path, .. } => {
                GitHubResponse::FileContents(s.files.get(&path).cloned())
            }
            GitHubEffect::ListLabels { target } => {
                GitHubResponse::Labels(s.labels.get(&target).cloned().unwrap_or_default())
            }
            GitHubEffect::ListRepoLabels => GitHubResponse::RepoLabels(s.repo_labels.clone()),
            GitHubEffect::ListReviews { pr } => {
                GitHubResponse::Reviews(s.reviews.get(&pr).cloned().unwrap_or_default())
            }
            GitHubEffect::ListCheckRuns { sha } => {
                let queue = s.check_runs.entry(sha).or_default();
                let runs = if queue.len() > 1 {
                    queue.remove(0)
                } else {
                    queue.first().cloned().unwrap_or_default()
                };
                GitHubResponse::CheckRuns(runs)
            }
            GitHubEffect::GetUser { login } => GitHubResponse::User(
                s.users
                    .get(&login)
                    .cloned()
                    .ok_or_else(|| not_found(format!("user {}", login)))?,
            ),
            GitHubEffect::AddLabels { target, labels } => {
                let current = s.labels.entry(target).or_default();
                for label in labels {
                    if !current.contains(&label) {
                        current.push(label);
                    }
                }
                GitHubResponse::LabelsAdded
            }
            GitHubEffect::RemoveLabel { target, label } => {
                let current = s.labels.entry(target).or_default();
                let before = current.len();
                current.retain(|l| *l != label);
                if current.len() == before {
                    return Err(not_found(format!("label {}", label)));
                }
                GitHubResponse::LabelRemoved
            }
            GitHubEffect::CreateLabel { name, color, .. } => {
                if s.repo_labels.iter().any(|l| l.name == name) {
                    return Err(GitHubApiError::with_status(422, "label already exists"));
                }
                s.repo_labels.push(LabelData { name, color });
                GitHubResponse::LabelCreated
            }
            GitHubEffect::UpdateLabelColor { name, color } => {
                let label = s
                    .repo_labels
                    .iter_mut()
                    .find(|l| l.name == name)
                    .ok_or_else(|| not_found(format!("label {}", name)))?;
                label.color = color;
                GitHubResponse::LabelUpdated
            }
            GitHubEffect::PostComment { target, body } => {
                s.comments.push((target, body));
                s.next_comment_id += 1;
                GitHubResponse::CommentPosted {
                    id: CommentId(s.next_comment_id),
                }
            }
            GitHubEffect::RequestReviewers {
                pr,
                reviewers,
                team_reviewers,
            } => {
                if let Some(bad) = reviewers
                    .iter()
                    .chain(&team_reviewers)
                    .find(|r| s.rejected_reviewers.contains(*r))
                {
                    return Err(GitHubApiError::with_status(
                        422,
                        format!("{} is not a collaborator", bad),
                    ));
                }
                let requested = s.requested.entry(pr).or_default();
                requested.extend(reviewers);
                requested.extend(team_reviewers);
                GitHubResponse::ReviewersRequested
            }
            GitHubEffect::AddAssignees { target, assignees } => {
                s.assignees.entry(target).or_default().extend(assignees);
                GitHubResponse::AssigneesAdded
            }
        };

        Ok(response)
    }
}

impl GitHubInterpreter for MockGitHub {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, Self::Error> {
        self.apply(effect)
    }
}

// ─── RecordingSink ────────────────────────────────────────────────────────────

/// A webhook sink that records payloads and answers with a fixed status.
pub struct RecordingSink {
    status: u16,
    sent: Mutex<Vec<WebhookPayload>>,
}

impl RecordingSink {
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<WebhookPayload> {
        self.sent.lock().unwrap().clone()
    }
}

impl WebhookSink for RecordingSink {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), WebhookError> {
        self.sent.lock().unwrap().push(payload.clone());
        if (200..300).contains(&self.status) {
            Ok(())
        } else {
            Err(WebhookError::Status(self.status))
        }
    }
}
