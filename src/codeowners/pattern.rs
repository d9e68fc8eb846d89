//! Glob-to-matcher compiler for ownership patterns.
//!
//! A pattern is compiled once, when the ownership file is loaded, into a
//! sequence of tokens. Matching walks the tokens against the path with a
//! single backtracking point per `*`, so no regular expression is built per
//! file.
//!
//! # Syntax
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `*` | any run of characters, **including** `/` |
//! | `?` | exactly one character |
//! | `[abc]`, `[a-z]` | one character from the class |
//! | `[!abc]`, `[^abc]` | one character not in the class |
//! | `\x` | the literal character `x` |
//!
//! A leading `/` (the CODEOWNERS "repository root" anchor) is dropped, since
//! changed-file paths are always repository-relative.
//!
//! # Anchoring
//!
//! Ownership rules use [`Pattern::matches_prefix`]: the path matches when it
//! *starts with* text matched by the pattern. `src/api` therefore also
//! matches `src/apiary/main.go`. Label filters use [`Pattern::matches_full`],
//! which anchors at both ends like `fnmatch`.

use std::fmt;

use thiserror::Error;

/// Error produced when a pattern cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern was empty.
    #[error("empty pattern")]
    Empty,

    /// A `[` character class was never closed.
    #[error("unterminated character class in pattern {pattern:?} at byte {offset}")]
    UnterminatedClass { pattern: String, offset: usize },

    /// A character class contained no characters (e.g. `[!]`).
    #[error("empty character class in pattern {pattern:?} at byte {offset}")]
    EmptyClass { pattern: String, offset: usize },

    /// A range inside a class runs backwards (e.g. `[z-a]`).
    #[error("invalid range {start}-{end} in pattern {pattern:?}")]
    InvalidRange {
        pattern: String,
        start: char,
        end: char,
    },

    /// The pattern ended with an unescaped backslash.
    #[error("trailing escape in pattern {pattern:?}")]
    TrailingEscape { pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    fn matches_char(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnyRun => true,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match item {
                    ClassItem::Single(s) => *s == c,
                    ClassItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
                });
                hit != *negated
            }
        }
    }
}

/// A compiled ownership pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] for empty patterns, unbalanced `[` classes,
    /// backwards ranges, and trailing backslashes.
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }

        let body = raw.strip_prefix('/').unwrap_or(raw);
        let chars: Vec<(usize, char)> = body.char_indices().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            let (offset, c) = chars[i];
            match c {
                '*' => {
                    // Consecutive stars are equivalent to one.
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    i += 1;
                }
                '\\' => {
                    let (_, escaped) = chars.get(i + 1).copied().ok_or_else(|| {
                        PatternError::TrailingEscape {
                            pattern: raw.to_string(),
                        }
                    })?;
                    tokens.push(Token::Literal(escaped));
                    i += 2;
                }
                '[' => {
                    let (token, next) = parse_class(raw, &chars, i, offset)?;
                    tokens.push(token);
                    i = next;
                }
                other => {
                    tokens.push(Token::Literal(other));
                    i += 1;
                }
            }
        }

        Ok(Pattern {
            source: raw.to_string(),
            tokens,
        })
    }

    /// Returns the pattern text as written in the ownership file.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if `path` starts with text matched by this pattern.
    pub fn matches_prefix(&self, path: &str) -> bool {
        let text: Vec<char> = path.chars().collect();
        match_tokens(&self.tokens, &text, false)
    }

    /// Returns true if the whole of `path` is matched by this pattern.
    pub fn matches_full(&self, path: &str) -> bool {
        let text: Vec<char> = path.chars().collect();
        match_tokens(&self.tokens, &text, true)
    }

    /// Returns the pattern as a plain path if it contains no wildcards.
    ///
    /// Leading and trailing slashes are removed, so `/docs/` yields `docs`.
    /// Used to derive directory labels from CODEOWNERS entries.
    pub fn literal_path(&self) -> Option<String> {
        let mut out = String::with_capacity(self.tokens.len());
        for token in &self.tokens {
            match token {
                Token::Literal(c) => out.push(*c),
                _ => return None,
            }
        }
        let trimmed = out.trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses a `[...]` class starting at `chars[start]`. Returns the token and
/// the index just past the closing `]`.
fn parse_class(
    raw: &str,
    chars: &[(usize, char)],
    start: usize,
    offset: usize,
) -> Result<(Token, usize), PatternError> {
    let mut i = start + 1;
    let mut negated = false;
    if let Some((_, '!' | '^')) = chars.get(i) {
        negated = true;
        i += 1;
    }

    let mut items = Vec::new();
    let first = i;
    loop {
        let Some(&(_, c)) = chars.get(i) else {
            return Err(PatternError::UnterminatedClass {
                pattern: raw.to_string(),
                offset,
            });
        };

        // A `]` directly after the opening bracket is a literal member.
        if c == ']' && i > first {
            break;
        }

        let member = if c == '\\' {
            i += 1;
            match chars.get(i) {
                Some(&(_, escaped)) => escaped,
                None => {
                    return Err(PatternError::TrailingEscape {
                        pattern: raw.to_string(),
                    });
                }
            }
        } else {
            c
        };

        match (chars.get(i + 1), chars.get(i + 2)) {
            (Some(&(_, '-')), Some(&(_, end))) if end != ']' => {
                if end < member {
                    return Err(PatternError::InvalidRange {
                        pattern: raw.to_string(),
                        start: member,
                        end,
                    });
                }
                items.push(ClassItem::Range(member, end));
                i += 3;
            }
            _ => {
                items.push(ClassItem::Single(member));
                i += 1;
            }
        }
    }

    if items.is_empty() {
        return Err(PatternError::EmptyClass {
            pattern: raw.to_string(),
            offset,
        });
    }

    Ok((Token::Class { negated, items }, i + 1))
}

/// Walks tokens over text, backtracking to the most recent `*` on mismatch.
///
/// With `anchored_end == false` the match succeeds as soon as the tokens are
/// exhausted, whatever text remains.
fn match_tokens(tokens: &[Token], text: &[char], anchored_end: bool) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut backtrack: Option<(usize, usize)> = None;

    loop {
        if p == tokens.len() {
            if !anchored_end || t == text.len() {
                return true;
            }
        } else if tokens[p] == Token::AnyRun {
            backtrack = Some((p + 1, t));
            p += 1;
            continue;
        } else if t < text.len() && tokens[p].matches_char(text[t]) {
            p += 1;
            t += 1;
            continue;
        }

        match backtrack {
            Some((resume, consumed)) if consumed < text.len() => {
                backtrack = Some((resume, consumed + 1));
                p = resume;
                t = consumed + 1;
            }
            _ => return false,
        }
    }
}

/// Matches a raw pattern against a path with ownership (prefix) semantics.
///
/// A pattern that fails to compile never matches.
pub fn matches(pattern: &str, path: &str) -> bool {
    Pattern::compile(pattern)
        .map(|p| p.matches_prefix(path))
        .unwrap_or(false)
}
