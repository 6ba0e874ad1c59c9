//! Key Matching
//!
//! Turns a read key or list filter into a predicate, and translates that
//! predicate into the native query syntax of each engine: glob patterns for
//! Redis `KEYS` and `LIKE` patterns for SQL.
//!
//! Wildcard characters inside keys are passed through unescaped, so a key
//! containing `*` or `%` matches according to the engine's own rules.

use crate::models::{ListOptions, ReadOptions};

// == Key Match ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch {
    /// Every key in the namespace
    All,
    /// Exactly this key
    Exact(String),
    /// Keys starting with `prefix` or ending with `suffix` (union when both)
    Affix {
        prefix: Option<String>,
        suffix: Option<String>,
    },
}

impl KeyMatch {
    /// Builds the predicate for `read(key)`; the key is reused as prefix
    /// and/or suffix depending on the flags.
    pub fn for_read(key: &str, opts: &ReadOptions) -> Self {
        if !opts.prefix && !opts.suffix {
            return KeyMatch::Exact(key.to_string());
        }
        KeyMatch::Affix {
            prefix: opts.prefix.then(|| key.to_string()),
            suffix: opts.suffix.then(|| key.to_string()),
        }
    }

    /// Builds the predicate for `list()`.
    pub fn for_list(opts: &ListOptions) -> Self {
        let prefix = opts.prefix.clone().filter(|p| !p.is_empty());
        let suffix = opts.suffix.clone().filter(|s| !s.is_empty());
        if prefix.is_none() && suffix.is_none() {
            KeyMatch::All
        } else {
            KeyMatch::Affix { prefix, suffix }
        }
    }

    /// Literal evaluation used by the in-memory backend.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatch::All => true,
            KeyMatch::Exact(exact) => key == exact,
            KeyMatch::Affix { prefix, suffix } => {
                prefix.as_deref().is_some_and(|p| key.starts_with(p))
                    || suffix.as_deref().is_some_and(|s| key.ends_with(s))
            }
        }
    }

    // == Redis Translation ==
    /// Glob patterns for `KEYS`, already scoped by the namespace prefix.
    /// `Exact` yields the storage key itself, which needs a plain lookup
    /// rather than a scan.
    pub fn glob_patterns(&self, namespace_prefix: &str) -> Vec<String> {
        match self {
            KeyMatch::All => vec![format!("{namespace_prefix}*")],
            KeyMatch::Exact(key) => vec![format!("{namespace_prefix}{key}")],
            KeyMatch::Affix { prefix, suffix } => {
                let mut patterns = Vec::with_capacity(2);
                if let Some(p) = prefix {
                    patterns.push(format!("{namespace_prefix}{p}*"));
                }
                if let Some(s) = suffix {
                    patterns.push(format!("{namespace_prefix}*{s}"));
                }
                patterns
            }
        }
    }

    // == SQL Translation ==
    /// `LIKE` patterns OR-ed together by the SQL backend. Empty for `All`
    /// and `Exact`, which translate to no predicate and `=` respectively.
    pub fn like_patterns(&self) -> Vec<String> {
        match self {
            KeyMatch::All | KeyMatch::Exact(_) => Vec::new(),
            KeyMatch::Affix { prefix, suffix } => {
                let mut patterns = Vec::with_capacity(2);
                if let Some(p) = prefix {
                    patterns.push(format!("{p}%"));
                }
                if let Some(s) = suffix {
                    patterns.push(format!("%{s}"));
                }
                patterns
            }
        }
    }
}
