//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a CommentId
//! where a PrNumber is expected) and make the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A pull request (or issue) number within a repository.
///
/// GitHub issues and pull requests share one number space, so this is also
/// the identifier used when labeling or commenting on an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrNumber(pub u64);

impl fmt::Display for PrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PrNumber {
    fn from(n: u64) -> Self {
        PrNumber(n)
    }
}

/// Error returned when a string is not a valid commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid commit SHA {0:?}: expected 40 hex characters")]
pub struct InvalidSha(pub String);

/// A git commit SHA (40 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(String);

impl Sha {
    /// Parses a SHA, accepting exactly 40 hex characters (any case).
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidSha> {
        let s = s.into();
        if s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Sha(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s))
        }
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a repository string is not in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository {0:?}: expected owner/repo")]
pub struct InvalidRepoId(pub String);

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl FromStr for RepoId {
    type Err = InvalidRepoId;

    /// Parses `owner/repo`, also accepting a `https://github.com/` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .trim()
            .strip_prefix("https://github.com/")
            .or_else(|| s.trim().strip_prefix("github.com/"))
            .unwrap_or(s.trim())
            .trim_end_matches('/');

        match trimmed.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(RepoId::new(owner, repo))
            }
            _ => Err(InvalidRepoId(s.to_string())),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A GitHub comment ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub u64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CommentId {
    fn from(n: u64) -> Self {
        CommentId(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pr_number {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_format(n: u64) {
                let pr = PrNumber(n);
                prop_assert_eq!(format!("{}", pr), format!("#{}", n));
            }

            #[test]
            fn ordering_matches_underlying(a: u64, b: u64) {
                prop_assert_eq!(PrNumber(a).cmp(&PrNumber(b)), a.cmp(&b));
            }
        }
    }

    mod sha {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_accepts_hex(s in "[0-9a-fA-F]{40}") {
                let sha = Sha::parse(s.clone()).unwrap();
                prop_assert_eq!(sha.as_str(), s.to_ascii_lowercase());
                prop_assert_eq!(sha.short().len(), 7);
            }

            #[test]
            fn parse_rejects_wrong_length(s in "[0-9a-f]{0,39}") {
                prop_assert!(Sha::parse(s).is_err());
            }
        }

        #[test]
        fn parse_rejects_non_hex() {
            let bad = "g".repeat(40);
            assert_eq!(Sha::parse(bad.clone()), Err(InvalidSha(bad)));
        }
    }

    mod repo_id {
        use super::*;

        #[test]
        fn parses_owner_and_repo() {
            let repo: RepoId = "octo/widgets".parse().unwrap();
            assert_eq!(repo, RepoId::new("octo", "widgets"));
            assert_eq!(repo.to_string(), "octo/widgets");
        }

        #[test]
        fn strips_github_url_prefix() {
            let repo: RepoId = "https://github.com/octo/widgets/".parse().unwrap();
            assert_eq!(repo, RepoId::new("octo", "widgets"));
        }

        #[test]
        fn rejects_malformed() {
            assert!("widgets".parse::<RepoId>().is_err());
            assert!("/widgets".parse::<RepoId>().is_err());
            assert!("octo/".parse::<RepoId>().is_err());
            assert!("a/b/c".parse::<RepoId>().is_err());
        }
    }
}
