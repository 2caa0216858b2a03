use std::fmt;

use crate::process::{ProcessListing, ProcessRecord};

/// Ordered set of case-insensitive substrings naming the processes to protect.
/// Immutable once built; share it behind an `Arc` when more than one task reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    terms: Vec<String>,
    /// Lower-cased copies of `terms`, computed once.
    folded: Vec<String>,
}

impl WatchList {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        let folded = terms.iter().map(|t| t.to_lowercase()).collect();
        Self { terms, folded }
    }

    /// Parses the comma-separated form (`"brave, firefox,chrome"`).
    /// Whitespace around terms is trimmed and empty pieces are dropped.
    pub fn parse(input: &str) -> Self {
        Self::new(
            input
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        )
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True if any term occurs, ignoring case, inside `candidate`.
    /// The term is the needle: `"fire"` matches `"Firefox.exe"`, not the reverse.
    pub fn matches(&self, candidate: &str) -> bool {
        if self.folded.is_empty() {
            return false;
        }
        let candidate = candidate.to_lowercase();
        self.folded.iter().any(|term| candidate.contains(term.as_str()))
    }

    pub fn matching<'a>(
        &'a self,
        listing: &'a ProcessListing,
    ) -> impl Iterator<Item = &'a ProcessRecord> + 'a {
        listing.records.iter().filter(move |r| self.matches(&r.name))
    }
}

impl fmt::Display for WatchList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.terms.join(", "))
    }
}
