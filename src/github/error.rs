//! Classified GitHub API failures.
//!
//! Every failure is either transient (worth retrying a read) or permanent.
//! Writes are never retried whatever the kind.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// 5xx, 429, rate-limit 403, network trouble.
    Transient,
    /// Everything else: 404, 422 (e.g. reviewer not a collaborator), auth.
    Permanent,
}

#[derive(Debug, Error)]
#[error("GitHub API error{}: {message}", .status_code.map(|c| format!(" (HTTP {c})")).unwrap_or_default())]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
    #[source]
    pub source: Option<octocrab::Error>,
}

impl GitHubApiError {
    /// An error with a known status, classified from the status alone.
    pub fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: classify(Some(status_code), ""),
            status_code: Some(status_code),
            message: message.into(),
            source: None,
        }
    }

    /// A non-HTTP failure that retrying will not fix, such as an
    /// undecodable response.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let message = err.to_string();
        let status_code = match &err {
            octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
            _ => status_from_message(&message),
        };
        Self {
            kind: classify(status_code, &message),
            status_code,
            message,
            source: Some(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    let lower = message.to_lowercase();
    let rate_limited = ["rate limit", "abuse detection"]
        .iter()
        .any(|m| lower.contains(m));
    let network = ["timeout", "timed out", "connection", "dns", "network"]
        .iter()
        .any(|m| lower.contains(m));

    match status_code {
        Some(429) | Some(500..=599) => GitHubErrorKind::Transient,
        Some(403) if rate_limited => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if rate_limited || network => GitHubErrorKind::Transient,
        None => GitHubErrorKind::Permanent,
    }
}

/// Octocrab only carries a structured status on `Error::GitHub`; for the
/// other variants look for one in the rendered message.
fn status_from_message(message: &str) -> Option<u16> {
    let idx = message.find("status: ")?;
    let digits: String = message[idx + 8..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
