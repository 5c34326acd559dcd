//! One physical input line as it moves through the pipeline.
//!
//! Station logs are legacy fixed-width or delimited exports containing
//! Danish text, so all offsets handled here are codepoint offsets, never
//! byte offsets.

/// A single input row together with its lowercase form for matching.
///
/// The lowercase copy is computed once and shared by the stopword filter
/// and the additional-output router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    raw: &'a str,
    lower: String,
}

impl<'a> Line<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lower: raw.to_lowercase(),
        }
    }

    /// The original, unmodified text.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// The lowercase copy used for case-insensitive matching.
    pub fn lower(&self) -> &str {
        &self.lower
    }

    /// True if the line has no non-whitespace content.
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// Terminal classification of a non-blank input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Matched a stopword; written only to the rejection log.
    Rejected,
    /// Extracted and written to exactly one of main or additional output.
    Processed,
}

/// Byte index of every codepoint boundary in `s`, including `s.len()`.
///
/// `boundaries[i]..boundaries[j]` is the byte range of codepoints `i..j`.
pub(crate) fn char_boundaries(s: &str) -> Vec<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_keeps_raw() {
        let line = Line::new("Friday JINGLE Øresund");
        assert_eq!(line.raw(), "Friday JINGLE Øresund");
        assert_eq!(line.lower(), "friday jingle øresund");
    }

    #[test]
    fn test_blank_detection() {
        assert!(Line::new("").is_blank());
        assert!(Line::new(" \t ").is_blank());
        assert!(!Line::new(" x ").is_blank());
    }

    #[test]
    fn test_char_boundaries() {
        assert_eq!(char_boundaries(""), vec![0]);
        assert_eq!(char_boundaries("ab"), vec![0, 1, 2]);
        // 'æ' is two bytes in UTF-8
        assert_eq!(char_boundaries("æb"), vec![0, 2, 3]);
    }
}
