//! The sensitive-word filter: a pure predicate over a user message.
//!
//! The gateway treats this as an external collaborator — spec'd as a
//! "sensitive-word trie" called through a single `is_sensitive` operation.
//! [`AhoCorasickFilter`] is a real, lock-free-reads implementation of that
//! interface built on a multi-pattern automaton, which is the trie the
//! original gateway builds by hand.

use std::fs;
use std::path::Path;

use aho_corasick::AhoCorasick;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensitiveError {
    #[error("read sensitive word list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("build sensitive word automaton: {0}")]
    Build(#[from] aho_corasick::BuildError),
}

/// Predicate interface: does this message contain a disallowed word?
pub trait SensitiveFilter: Send + Sync {
    fn is_sensitive(&self, message: &str) -> bool;
}

/// A filter that always passes everything through. Used when no word list
/// is configured, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFilter;

impl SensitiveFilter for NoopFilter {
    fn is_sensitive(&self, _message: &str) -> bool {
        false
    }
}

/// Multi-pattern substring matcher built once at startup; `is_sensitive`
/// reads are lock-free against the built automaton.
pub struct AhoCorasickFilter {
    automaton: AhoCorasick,
}

impl AhoCorasickFilter {
    /// Build from an explicit word list (case-sensitive, exact substring
    /// match — matches the original trie's semantics).
    pub fn from_words<I, S>(words: I) -> Result<Self, SensitiveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let automaton = AhoCorasick::new(words)?;
        Ok(Self { automaton })
    }

    /// Load a newline-delimited word list from disk. Blank lines are
    /// ignored. An empty path yields a filter that matches nothing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SensitiveError> {
        let path_ref = path.as_ref();
        if path_ref.as_os_str().is_empty() {
            return Self::from_words(Vec::<String>::new());
        }
        let raw = fs::read_to_string(path_ref).map_err(|source| SensitiveError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        let words: Vec<&str> = raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        Self::from_words(words)
    }
}

impl SensitiveFilter for AhoCorasickFilter {
    fn is_sensitive(&self, message: &str) -> bool {
        self.automaton.is_match(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_any_configured_word_as_substring() {
        let filter = AhoCorasickFilter::from_words(["badword"]).unwrap();
        assert!(filter.is_sensitive("this has badword inside"));
        assert!(!filter.is_sensitive("this is clean"));
    }

    #[test]
    fn empty_word_list_matches_nothing() {
        let filter = AhoCorasickFilter::from_words(Vec::<String>::new()).unwrap();
        assert!(!filter.is_sensitive("anything at all"));
    }

    #[test]
    fn noop_filter_never_matches() {
        assert!(!NoopFilter.is_sensitive("badword"));
    }
}
