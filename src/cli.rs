//! Command-line interface.
//!
//! Every option can also come from the environment variables GitHub Actions
//! provides, so a workflow step is usually just `pr-steward <command>`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use chrono::Utc;

use crate::automations::{
    self, AnnounceConfig, AnnounceOutcome, AutoMergeReport, PollConfig, ReminderOutcome,
    metadata::DEFAULT_REMINDER_LABEL, stale::DEFAULT_STALE_DAYS,
};
use crate::config::RepoConfig;
use crate::effects::{DryRunInterpreter, GitHubInterpreter, PrData, ops};
use crate::event::read_event_file;
use crate::gate::{LabelMarkerStore, NotificationGate};
use crate::github::OctocrabClient;
use crate::notify::{
    LoggingSink, SlackWebhook, UnconfiguredSink, WebhookError, WebhookPayload, WebhookSink,
};
use crate::types::{PrNumber, RepoId};

/// CODEOWNERS-driven reviewer assignment, PR labelling and Slack notifications
#[derive(Parser, Debug)]
#[command(name = "pr-steward", version, about, long_about = None)]
pub struct Cli {
    /// Repository in owner/repo form
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: RepoId,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Slack incoming-webhook URL; notifications are skipped when unset
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,

    /// Directory holding the repository checkout (for `.github/` config files)
    #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    /// Perform reads, log writes and webhook deliveries instead of doing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PrArgs {
    /// Pull request number
    #[arg(long, env = "PR_NUMBER")]
    pub pr: u64,
}

/// Where to find the PR: an explicit number, or the Actions event payload.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PrSource {
    /// Pull request number; takes precedence over the event file
    #[arg(long, env = "PR_NUMBER")]
    pub pr: Option<u64>,

    /// Path of the triggering event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,

    /// Name of the triggering event
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "pull_request")]
    pub event_name: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Request reviews from the code owners of the changed files
    AssignReviewers(PrArgs),

    /// Label the PR by the directories it touches
    LabelPaths(PrArgs),

    /// Label the PR by the number of changed lines
    SizeLabel(PrArgs),

    /// Nudge the authors of long-open PRs
    Stale {
        /// Age in days from which a PR counts as stale
        #[arg(long, env = "STALE_DAYS", default_value_t = DEFAULT_STALE_DAYS)]
        stale_days: u32,
    },

    /// Announce the PR in Slack once its required checks pass
    NotifyPr {
        #[command(flatten)]
        source: PrSource,

        /// Also mention the code owners of the changed files
        #[arg(long, env = "USE_CODEOWNERS")]
        use_codeowners: bool,

        /// Maximum number of check-run polls
        #[arg(long, default_value_t = PollConfig::DEFAULT.max_attempts)]
        max_attempts: u32,

        /// Seconds between check-run polls
        #[arg(long, default_value_t = PollConfig::DEFAULT.interval.as_secs())]
        poll_interval: u64,
    },

    /// Remind the author of a labelled PR about follow-up work
    MetadataReminder {
        #[command(flatten)]
        source: PrSource,

        /// Label that triggers the reminder
        #[arg(long, default_value = DEFAULT_REMINDER_LABEL)]
        label: String,
    },

    /// Print whether the PR may be auto-merged; exits 0 only when it may
    AutoMergeCheck(PrArgs),
}

/// The webhook sink chosen from the command line.
enum Sink {
    Slack(SlackWebhook),
    Logging(LoggingSink),
    Unconfigured(UnconfiguredSink),
}

impl WebhookSink for Sink {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), WebhookError> {
        match self {
            Sink::Slack(sink) => sink.send(payload).await,
            Sink::Logging(sink) => sink.send(payload).await,
            Sink::Unconfigured(sink) => sink.send(payload).await,
        }
    }
}

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let client = OctocrabClient::from_token(cli.token.clone(), cli.repo.clone())
        .context("failed to build GitHub client")?;

    let sink = if cli.dry_run {
        Sink::Logging(LoggingSink)
    } else if let Some(url) = &cli.slack_webhook_url {
        Sink::Slack(SlackWebhook::new(url.as_str())?)
    } else {
        tracing::info!("No Slack webhook configured; notifications will be skipped");
        Sink::Unconfigured(UnconfiguredSink)
    };

    tracing::info!(repo = %cli.repo, dry_run = cli.dry_run, command = ?cli.command, "Starting");

    if cli.dry_run {
        execute(&cli.command, &DryRunInterpreter::new(&client), &sink, &cli.workspace).await
    } else {
        execute(&cli.command, &client, &sink, &cli.workspace).await
    }
}

async fn execute<G, W>(command: &Command, github: &G, sink: &W, workspace: &Path) -> Result<ExitCode>
where
    G: GitHubInterpreter + Sync,
    W: WebhookSink + Sync,
{
    let gate = NotificationGate::new(LabelMarkerStore::new(github));

    match command {
        Command::AssignReviewers(args) => {
            let result = automations::assign_reviewers(github, PrNumber(args.pr)).await?;
            if let Some(report) = result.report {
                tracing::info!(%report, "Done");
            }
        }

        Command::LabelPaths(args) => {
            let config = RepoConfig::load(workspace)?;
            let report =
                automations::label_paths(github, PrNumber(args.pr), &config.label_filters).await?;
            tracing::info!(labels = ?report.labels, created = ?report.created, "Done");
        }

        Command::SizeLabel(args) => {
            let report = automations::apply_size_label(github, PrNumber(args.pr)).await?;
            tracing::info!(label = report.label, lines = report.changed_lines, "Done");
        }

        Command::Stale { stale_days } => {
            let report = automations::check_stale(github, &gate, sink, *stale_days, Utc::now()).await?;
            tracing::info!(
                checked = report.checked,
                notified = report.notified.len(),
                suppressed = report.suppressed.len(),
                failed = report.failed.len(),
                "Done"
            );
        }

        Command::NotifyPr {
            source,
            use_codeowners,
            max_attempts,
            poll_interval,
        } => {
            let Some(pr) = load_pr(github, source).await? else {
                return Ok(ExitCode::SUCCESS);
            };
            let repo_config = RepoConfig::load(workspace)?;
            let config = AnnounceConfig {
                required_workflows: repo_config.required_workflows,
                slack_users: repo_config.slack_users,
                use_codeowners: *use_codeowners,
                poll: PollConfig {
                    max_attempts: *max_attempts,
                    interval: Duration::from_secs(*poll_interval),
                },
            };
            match automations::announce_pr(github, &gate, sink, &pr, &config).await? {
                AnnounceOutcome::Announced(_) => tracing::info!(pr = %pr.number, "Announced"),
                AnnounceOutcome::AlreadyAnnounced => {}
                AnnounceOutcome::DeliveryFailed(report) => {
                    tracing::warn!(%report, "Announcement not delivered");
                }
            }
        }

        Command::MetadataReminder { source, label } => {
            let Some(pr) = load_pr(github, source).await? else {
                return Ok(ExitCode::SUCCESS);
            };
            let config = RepoConfig::load(workspace)?;
            let outcome =
                automations::remind_metadata(github, &gate, sink, &pr, label, &config.slack_users)
                    .await?;
            if let ReminderOutcome::Failed(e) = outcome {
                tracing::warn!(pr = %pr.number, error = %e, "Reminder not delivered");
            }
        }

        Command::AutoMergeCheck(args) => {
            let pr = PrNumber(args.pr);
            let eligibility = automations::check_auto_merge(github, pr).await?;
            let report = AutoMergeReport::new(pr, eligibility);
            println!("{}", serde_json::to_string(&report)?);
            if !eligibility.is_eligible() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Loads the PR named on the command line, or from the event payload.
///
/// Returns `None` when the event is not one any automation reacts to.
async fn load_pr<G: GitHubInterpreter>(github: &G, source: &PrSource) -> Result<Option<PrData>> {
    if let Some(number) = source.pr {
        return Ok(Some(ops::get_pr(github, PrNumber(number)).await?));
    }

    let Some(path) = &source.event_path else {
        bail!("either --pr or --event-path is required");
    };
    let event = read_event_file(&source.event_name, path)
        .with_context(|| format!("failed to load event from {}", path.display()))?;
    match event {
        Some(event) => Ok(Some(event.pr)),
        None => {
            tracing::info!(event = %source.event_name, "Event is not a relevant pull request event; nothing to do");
            Ok(None)
        }
    }
}
