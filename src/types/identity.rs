//! Reviewer and owner identities.
//!
//! CODEOWNERS files, PR payloads and chat mappings all refer to people with
//! slightly different spellings (`@alice`, `alice`, ` @alice `). An
//! [`Identity`] is the normalized form: surrounding whitespace and a single
//! leading `@` are stripped, and equality is exact string match afterwards.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized user or team reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Normalizes a raw owner token into an identity.
    ///
    /// Returns `None` when nothing remains after normalization.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
        if name.is_empty() {
            None
        } else {
            Some(Identity(name.to_string()))
        }
    }

    /// Returns the identity as a string slice (without the `@` marker).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the team slug if this identity names a team (`org/team`).
    pub fn team_slug(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, team)| team)
    }

    /// Returns true if this identity names a team rather than a user.
    pub fn is_team(&self) -> bool {
        self.team_slug().is_some()
    }

    /// Renders the identity as a GitHub mention (`@name`).
    pub fn mention(&self) -> String {
        format!("@{}", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identity {
    /// Normalizes during deserialization. An empty string stays empty rather
    /// than failing, which keeps payload parsing lenient.
    fn from(s: String) -> Self {
        Identity::parse(&s).unwrap_or(Identity(String::new()))
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

/// A deduplicated, ordered set of identities.
///
/// Ordering only matters for deterministic rendering (comments, chat
/// messages, logs); set semantics are by identity string.
pub type OwnerSet = BTreeSet<Identity>;
