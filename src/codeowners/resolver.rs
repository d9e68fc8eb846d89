//! Owner resolution over a changed-file set.
//!
//! Resolution is a pure function of the rule set and the file list: every
//! rule is evaluated against every path and every match contributes its
//! owners. There is no "last match wins" as in GitHub's own CODEOWNERS
//! handling; later rules add to, never replace, earlier ones.

use crate::types::{Identity, OwnerSet};

use super::rules::RuleSet;

/// Outcome of resolving owners, keeping "no ownership file" distinct from
/// "ownership file present but nothing matched".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No ownership file was available.
    ConfigMissing,
    /// Rules were available but none matched any changed file.
    NoMatch,
    /// At least one rule matched.
    Matched(OwnerSet),
}

impl Resolution {
    /// Returns the resolved owners; empty for `ConfigMissing` and `NoMatch`.
    pub fn owners(&self) -> OwnerSet {
        match self {
            Resolution::Matched(owners) => owners.clone(),
            Resolution::ConfigMissing | Resolution::NoMatch => OwnerSet::new(),
        }
    }

    /// Consumes the resolution, returning its owners.
    pub fn into_owners(self) -> OwnerSet {
        match self {
            Resolution::Matched(owners) => owners,
            Resolution::ConfigMissing | Resolution::NoMatch => OwnerSet::new(),
        }
    }

    /// Logs the non-matching outcomes at warn level.
    pub fn log_outcome(&self, context: &str) {
        match self {
            Resolution::ConfigMissing => {
                tracing::warn!(context, "No CODEOWNERS file available; no owners resolved")
            }
            Resolution::NoMatch => {
                tracing::warn!(context, "No CODEOWNERS rule matched the changed files")
            }
            Resolution::Matched(owners) => {
                tracing::info!(context, owners = owners.len(), "Resolved code owners")
            }
        }
    }
}

/// Returns the union of owners of every rule matching any of `paths`.
pub fn resolve<'a, I>(rules: &RuleSet, paths: I) -> OwnerSet
where
    I: IntoIterator<Item = &'a str>,
{
    let mut owners = OwnerSet::new();
    for path in paths {
        owners.extend(owners_for_path(rules, path));
    }
    owners
}

/// Resolves owners, signalling a missing rule set and an empty match
/// separately.
pub fn resolve_outcome<'a, I>(rules: Option<&RuleSet>, paths: I) -> Resolution
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(rules) = rules else {
        return Resolution::ConfigMissing;
    };
    let owners = resolve(rules, paths);
    if owners.is_empty() {
        Resolution::NoMatch
    } else {
        Resolution::Matched(owners)
    }
}

/// Returns the owners of every rule matching a single path.
pub fn owners_for_path(rules: &RuleSet, path: &str) -> OwnerSet {
    rules
        .rules()
        .iter()
        .filter(|rule| rule.pattern.matches_prefix(path))
        .flat_map(|rule| rule.owners.iter().cloned())
        .collect()
}

/// Picks owners responsible for *all* changed files.
///
/// Returns the intersection of each file's owners. If that intersection is
/// empty (or there are no files with owners), falls back to every owner named
/// in the rule set so that someone is always assigned when rules exist.
pub fn common_owners<'a, I>(rules: &RuleSet, paths: I) -> OwnerSet
where
    I: IntoIterator<Item = &'a str>,
{
    let mut paths = paths.into_iter().peekable();
    if paths.peek().is_none() {
        return OwnerSet::new();
    }

    let mut common: Option<OwnerSet> = None;
    for path in paths {
        let file_owners = owners_for_path(rules, path);
        let next = match common {
            None => file_owners,
            Some(acc) => acc.intersection(&file_owners).cloned().collect(),
        };
        if next.is_empty() {
            common = Some(next);
            break;
        }
        common = Some(next);
    }

    match common {
        Some(owners) if !owners.is_empty() => owners,
        _ => {
            let all = rules.all_owners();
            if !all.is_empty() {
                tracing::info!("No common owners across changed files; using every owner");
            }
            all
        }
    }
}

/// Removes an identity (typically the PR author) from an owner set.
pub fn without(mut owners: OwnerSet, excluded: &Identity) -> OwnerSet {
    owners.remove(excluded);
    owners
}
