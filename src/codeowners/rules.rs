//! CODEOWNERS file parsing.
//!
//! The file is line-oriented: `<pattern> <@owner> [<@owner>...]`. Blank
//! lines and lines starting with `#` are ignored, as is anything after a
//! whitespace-preceded `#` on a rule line.
//!
//! Parsing never fails as a whole. Lines that cannot be used are skipped and
//! reported as [`RuleDiagnostic`]s so the caller can log them; the remaining
//! rules are still returned.

use std::fmt;

use crate::types::{Identity, OwnerSet};

use super::pattern::{Pattern, PatternError};

/// A single ownership rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRule {
    /// The compiled path pattern.
    pub pattern: Pattern,
    /// The owners named on this line (never empty).
    pub owners: OwnerSet,
    /// 1-based line number in the source file.
    pub line: usize,
}

/// Why a line was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The pattern could not be compiled.
    Pattern(PatternError),
    /// The line named a pattern but no owners.
    NoOwners { pattern: String },
    /// An owner token was not `@name` style. Other owners on the line are kept.
    InvalidOwner { token: String },
}

/// A problem found on one line of the ownership file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDiagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Pattern(e) => write!(f, "line {}: {}", self.line, e),
            DiagnosticKind::NoOwners { pattern } => {
                write!(f, "line {}: pattern {:?} has no owners", self.line, pattern)
            }
            DiagnosticKind::InvalidOwner { token } => {
                write!(f, "line {}: owner {:?} is not an @name", self.line, token)
            }
        }
    }
}

/// Ordered ownership rules, immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<OwnershipRule>,
}

/// Result of parsing an ownership file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRules {
    pub rules: RuleSet,
    pub diagnostics: Vec<RuleDiagnostic>,
}

impl ParsedRules {
    /// Emits one warning per skipped line. Lines without owners are logged
    /// at debug level since they are a legitimate way to un-own a path.
    pub fn log_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            match diagnostic.kind {
                DiagnosticKind::NoOwners { .. } => {
                    tracing::debug!(line = diagnostic.line, "{diagnostic}")
                }
                _ => tracing::warn!(line = diagnostic.line, "Skipping ownership rule: {diagnostic}"),
            }
        }
    }
}

impl RuleSet {
    /// Builds a rule set from already-constructed rules.
    pub fn from_rules(rules: Vec<OwnershipRule>) -> Self {
        RuleSet { rules }
    }

    /// Parses CODEOWNERS text.
    pub fn parse(text: &str) -> ParsedRules {
        let mut rules = Vec::new();
        let mut diagnostics = Vec::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = idx + 1;
            let content = strip_comment(raw_line).trim();
            if content.is_empty() {
                continue;
            }

            let mut parts = content.split_whitespace();
            let Some(raw_pattern) = parts.next() else {
                continue;
            };

            let mut owners = OwnerSet::new();
            for token in parts {
                match token.starts_with('@').then(|| Identity::parse(token)).flatten() {
                    Some(id) => {
                        owners.insert(id);
                    }
                    None => diagnostics.push(RuleDiagnostic {
                        line,
                        kind: DiagnosticKind::InvalidOwner {
                            token: token.to_string(),
                        },
                    }),
                }
            }

            if owners.is_empty() {
                diagnostics.push(RuleDiagnostic {
                    line,
                    kind: DiagnosticKind::NoOwners {
                        pattern: raw_pattern.to_string(),
                    },
                });
                continue;
            }

            match Pattern::compile(raw_pattern) {
                Ok(pattern) => rules.push(OwnershipRule {
                    pattern,
                    owners,
                    line,
                }),
                Err(e) => diagnostics.push(RuleDiagnostic {
                    line,
                    kind: DiagnosticKind::Pattern(e),
                }),
            }
        }

        ParsedRules {
            rules: RuleSet { rules },
            diagnostics,
        }
    }

    /// Returns the rules in file order.
    pub fn rules(&self) -> &[OwnershipRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns every owner named by any rule.
    pub fn all_owners(&self) -> OwnerSet {
        self.rules
            .iter()
            .flat_map(|r| r.owners.iter().cloned())
            .collect()
    }
}

/// Removes a trailing `# comment`. A `#` only starts a comment at the start
/// of the line or after whitespace, so patterns like `docs/#drafts` survive.
fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return "";
    }
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> OwnerSet {
        names.iter().filter_map(|n| Identity::parse(n)).collect()
    }

    #[test]
    fn parses_rules_in_file_order() {
        let parsed = RuleSet::parse(
            "# Ownership\n\
             \n\
             src/api/*   @alice @bob\n\
             src/forms/* @carol\n",
        );

        assert!(parsed.diagnostics.is_empty());
        let rules = parsed.rules.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].pattern.as_str(), "src/api/*");
        assert_eq!(rules[0].owners, ids(&["alice", "bob"]));
        assert_eq!(rules[0].line, 3);
        assert_eq!(rules[1].owners, ids(&["carol"]));
    }

    #[test]
    fn indented_comment_lines_are_ignored() {
        let parsed = RuleSet::parse("   # not a rule @alice\n");
        assert!(parsed.rules.is_empty());
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn trailing_comments_are_stripped() {
        let parsed = RuleSet::parse("docs/ @dave # docs team\n");
        assert_eq!(parsed.rules.rules()[0].owners, ids(&["dave"]));
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn rule_without_owners_is_skipped() {
        let parsed = RuleSet::parse("vendor/\nsrc/ @alice\n");
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(
            parsed.diagnostics,
            vec![RuleDiagnostic {
                line: 1,
                kind: DiagnosticKind::NoOwners {
                    pattern: "vendor/".to_string()
                },
            }]
        );
    }

    #[test]
    fn malformed_pattern_is_skipped_and_reported() {
        let parsed = RuleSet::parse("src/[api @alice\ndocs/* @dave\n");
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(parsed.rules.rules()[0].pattern.as_str(), "docs/*");
        assert_eq!(parsed.diagnostics.len(), 1);
        assert!(matches!(
            parsed.diagnostics[0].kind,
            DiagnosticKind::Pattern(PatternError::UnterminatedClass { .. })
        ));
    }

    #[test]
    fn non_mention_owner_tokens_are_reported() {
        let parsed = RuleSet::parse("src/ @alice someone@example.com\n");
        assert_eq!(parsed.rules.rules()[0].owners, ids(&["alice"]));
        assert_eq!(
            parsed.diagnostics[0].kind,
            DiagnosticKind::InvalidOwner {
                token: "someone@example.com".to_string()
            }
        );
    }

    #[test]
    fn duplicate_owners_on_a_line_collapse() {
        let parsed = RuleSet::parse("src/ @alice @alice\n");
        assert_eq!(parsed.rules.rules()[0].owners.len(), 1);
    }

    #[test]
    fn all_owners_unions_every_rule() {
        let parsed = RuleSet::parse("a/ @x @y\nb/ @y @z\n");
        assert_eq!(parsed.rules.all_owners(), ids(&["x", "y", "z"]));
    }

    #[test]
    fn diagnostics_render_with_line_numbers() {
        let parsed = RuleSet::parse("\n\nsrc/[x @a\n");
        assert!(parsed.diagnostics[0].to_string().starts_with("line 3:"));
    }
}
