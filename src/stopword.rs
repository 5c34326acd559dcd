//! Stopword rejection.
//!
//! A line is rejected when any stopword occurs anywhere in it, compared
//! case-insensitively as a plain substring. There is no word-boundary
//! logic: `"jingle"` rejects `"Friday Jingles"` too.

use crate::line::Line;
use crate::station::StationConfig;

/// Outcome of checking one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    /// No stopword matched; the line continues to extraction.
    Pass,
    /// The first stopword (in configured order) found in the line.
    Reject { stopword: &'a str },
}

/// Case-insensitive substring matcher over an ordered stopword list.
#[derive(Debug, Clone, Default)]
pub struct StopwordFilter {
    /// Lowercased, in configured order.
    stopwords: Vec<String>,
    enabled: bool,
}

impl StopwordFilter {
    pub fn new<S: AsRef<str>>(stopwords: &[S]) -> Self {
        Self {
            stopwords: stopwords
                .iter()
                .map(|word| word.as_ref().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
            enabled: true,
        }
    }

    /// Filter for a station's merged stopword list.
    pub fn for_station(station: &StationConfig) -> Self {
        Self::new(station.stopwords())
    }

    /// A filter that passes every line.
    pub fn disabled() -> Self {
        Self {
            stopwords: Vec::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.stopwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stopwords.is_empty()
    }

    /// Check a line, stopping at the first matching stopword.
    ///
    /// An empty stopword list never rejects.
    pub fn check(&self, line: &Line<'_>) -> Verdict<'_> {
        if !self.enabled {
            return Verdict::Pass;
        }
        match self.matched(line.lower()) {
            Some(stopword) => Verdict::Reject { stopword },
            None => Verdict::Pass,
        }
    }

    /// First stopword contained in an already-lowercased line.
    pub fn matched(&self, lower: &str) -> Option<&str> {
        self.stopwords
            .iter()
            .find(|word| lower.contains(word.as_str()))
            .map(String::as_str)
    }
}
