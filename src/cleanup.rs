//! Post-run column cleanup.
//!
//! Rewrites the main report in place: columns whose header is `DELETE`
//! are dropped, and so are rows that carry no data or lack an artist or
//! title.

use std::fmt;
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

use crate::error::{FormatterError, Result};

/// Header label marking a column for removal.
pub const DELETE_LABEL: &str = "DELETE";
pub const ARTIST_LABEL: &str = "Main Artist";
pub const TITLE_LABEL: &str = "Track Title";

/// What the cleanup removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_columns: usize,
    /// Rows that were blank or had an empty artist or title.
    pub removed_empty: usize,
    /// Rows too short to hold the artist and title columns.
    pub removed_malformed: usize,
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} column(s) removed, {} empty row(s), {} malformed row(s)",
            self.removed_columns, self.removed_empty, self.removed_malformed
        )
    }
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> FormatterError + '_ {
    move |source| FormatterError::Cleanup {
        path: path.to_path_buf(),
        source,
    }
}

/// Strip `DELETE` columns and empty rows from the CSV at `path`.
///
/// Fields are read and written verbatim (no quoting), so rows that are
/// kept come out byte-identical apart from the removed columns.
pub fn clean_columns(path: &Path, separator: char) -> Result<CleanupReport> {
    if !separator.is_ascii() {
        tracing::warn!("column cleanup skipped: separator {separator:?} is not ASCII");
        return Ok(CleanupReport::default());
    }
    let delimiter = separator as u8;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .map_err(csv_err(path))?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err(path))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let mut report = CleanupReport::default();
    let Some(header) = rows.first() else {
        return Ok(report);
    };

    let delete: Vec<bool> = header.iter().map(|h| h == DELETE_LABEL).collect();
    report.removed_columns = delete.iter().filter(|d| **d).count();
    let width = header.len();

    let strip = |mut row: Vec<String>| -> Vec<String> {
        if row.len() < width {
            row.resize(width, String::new());
        }
        row.into_iter()
            .enumerate()
            .filter(|(i, _)| !delete.get(*i).copied().unwrap_or(false))
            .map(|(_, value)| value)
            .collect()
    };

    let mut rows = rows.into_iter();
    let header = strip(rows.next().unwrap_or_default());
    let artist_idx = header.iter().position(|h| h == ARTIST_LABEL);
    let title_idx = header.iter().position(|h| h == TITLE_LABEL);

    let mut kept = vec![header];
    for row in rows.map(strip) {
        if row.iter().all(|value| value.trim().is_empty()) {
            report.removed_empty += 1;
            continue;
        }
        if let (Some(artist), Some(title)) = (artist_idx, title_idx) {
            if row.len() <= artist.max(title) {
                report.removed_malformed += 1;
                continue;
            }
            if row[artist].trim().is_empty() || row[title].trim().is_empty() {
                report.removed_empty += 1;
                continue;
            }
        }
        kept.push(row);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_path(path)
        .map_err(csv_err(path))?;
    for row in &kept {
        writer.write_record(row).map_err(csv_err(path))?;
    }
    writer.flush()?;

    tracing::info!("cleanup {}: {report}", path.display());
    Ok(report)
}
