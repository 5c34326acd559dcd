//! Field extraction.
//!
//! Turns one surviving input line into an ordered list of fields, either
//! by cutting it at fixed codepoint offsets or by splitting it on a
//! delimiter, then runs the station's transforms over the result.
//!
//! Extraction never fails. Offsets past the end of a line are clamped and
//! short lines produce empty fields; every captured substring ends up in
//! the field list in its original order.

use std::borrow::Cow;

use crate::line::char_boundaries;
use crate::station::{Layout, StationConfig};
use crate::transform;

/// Extracts fields for one station.
#[derive(Debug, Clone, Copy)]
pub struct LineExtractor<'a> {
    station: &'a StationConfig,
}

impl<'a> LineExtractor<'a> {
    pub fn new(station: &'a StationConfig) -> Self {
        Self { station }
    }

    /// Split `line` according to the station layout and apply its transforms.
    pub fn extract(&self, line: &str) -> Vec<String> {
        let mut fields = match self.station.layout() {
            Layout::Positional { cut_positions } => slice_positional(line, cut_positions),
            Layout::Delimited { input_separator } => split_delimited(line, *input_separator),
        };
        transform::apply_all(self.station.transforms(), &mut fields);
        fields
    }
}

/// Cut `line` at the given codepoint offsets.
///
/// Produces `cut_positions.len() + 1` trimmed fields: one per offset, plus
/// the remainder of the line after the last offset. Offsets beyond the line
/// are clamped to its length. Unsorted offsets are put in ascending order
/// first.
pub fn slice_positional(line: &str, cut_positions: &[usize]) -> Vec<String> {
    let positions: Cow<'_, [usize]> = if cut_positions.is_sorted() {
        Cow::Borrowed(cut_positions)
    } else {
        let mut sorted = cut_positions.to_vec();
        sorted.sort_unstable();
        Cow::Owned(sorted)
    };

    let bounds = char_boundaries(line);
    let char_len = bounds.len() - 1;
    let mut fields = Vec::with_capacity(positions.len() + 1);
    let mut cursor = 0;

    for &pos in positions.iter() {
        let end = pos.min(char_len);
        if end < cursor {
            // Only reachable with a corrupt position list.
            tracing::debug!("skipping cut position {pos} behind cursor {cursor}");
            continue;
        }
        fields.push(line[bounds[cursor]..bounds[end]].trim().to_string());
        cursor = end;
    }
    fields.push(line[bounds[cursor]..].trim().to_string());

    fields
}

/// Split `line` on `separator`, keeping fields exactly as they appear.
pub fn split_delimited(line: &str, separator: char) -> Vec<String> {
    line.split(separator).map(str::to_string).collect()
}
