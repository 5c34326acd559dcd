//! Line-at-a-time pipeline driver.
//!
//! Each input line runs through the whole chain (stopword filter,
//! extractor, router) before the next line is read. Only the counters in
//! [`RunSummary`] survive from one line to the next.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::cleanup::{self, CleanupReport};
use crate::error::Result;
use crate::extract::LineExtractor;
use crate::line::{Classification, Line};
use crate::router::{
    AdditionalFilter, DEFAULT_ADDITIONAL_POSTFIX, Destination, OutputPaths, OutputRouter, Stream,
};
use crate::station::StationConfig;
use crate::stopword::{StopwordFilter, Verdict};

/// Default directory for rejection logs.
pub const DEFAULT_REJECT_DIR: &str = "rejected";

/// Number of stopwords listed in the summary.
const TOP_STOPWORDS: usize = 10;

/// Operator choices for one run, already validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Main output file.
    pub output: PathBuf,
    /// Lines containing this text go to the additional output.
    pub additional_filter: Option<String>,
    pub additional_postfix: String,
    pub use_stopwords: bool,
    pub reject_dir: PathBuf,
    /// Run the column cleanup on the main output afterwards.
    pub cleanup: bool,
    /// Date stamped into the rejection log name.
    pub date: NaiveDate,
}

impl RunOptions {
    pub fn new(output: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            output: output.into(),
            additional_filter: None,
            additional_postfix: DEFAULT_ADDITIONAL_POSTFIX.to_string(),
            use_stopwords: true,
            reject_dir: PathBuf::from(DEFAULT_REJECT_DIR),
            cleanup: true,
            date,
        }
    }
}

/// Counts and artefacts of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub rejected: usize,
    /// Processed lines that went to the additional output.
    pub routed_additional: usize,
    pub skipped_blank: usize,
    /// Processed lines whose field count differs from the headline count.
    pub field_count_mismatches: usize,
    /// Failed row writes plus streams whose final flush failed. Lines are
    /// still counted as processed or rejected.
    pub write_failures: usize,
    /// Rejections per matching stopword.
    pub stopword_counts: BTreeMap<String, usize>,
    pub cleanup: Option<CleanupReport>,
    /// Output files left on disk after the run.
    pub main_output: Option<PathBuf>,
    pub additional_output: Option<PathBuf>,
    pub reject_log: Option<PathBuf>,
}

impl RunSummary {
    /// Most frequent stopwords, by count then alphabetically.
    pub fn top_stopwords(&self, n: usize) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .stopword_counts
            .iter()
            .map(|(word, count)| (word.as_str(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        counts.truncate(n);
        counts
    }

    fn record_write(&mut self, stream: Stream, line_idx: usize, result: io::Result<()>) {
        if let Err(e) = result {
            tracing::warn!("line {}: write to {stream} failed: {e}", line_idx + 1);
            self.write_failures += 1;
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed: {}", self.processed)?;
        if self.additional_output.is_some() || self.routed_additional > 0 {
            writeln!(f, "  of which additional: {}", self.routed_additional)?;
        }
        writeln!(f, "Rejected:  {}", self.rejected)?;
        if self.write_failures > 0 {
            writeln!(f, "Write failures: {}", self.write_failures)?;
        }
        for (label, path) in [
            ("Output", &self.main_output),
            ("Additional", &self.additional_output),
            ("Rejections", &self.reject_log),
        ] {
            if let Some(path) = path {
                writeln!(f, "{label}: {}", path.display())?;
            }
        }
        let top = self.top_stopwords(TOP_STOPWORDS);
        if !top.is_empty() {
            writeln!(f, "Rejection summary (top stopwords):")?;
            for (word, count) in top {
                writeln!(f, "  {count:5}x  {word}")?;
            }
        }
        Ok(())
    }
}

/// Drives filter, extractor and router over every line of a run.
pub struct PipelineDriver<'a> {
    station: &'a StationConfig,
    filter: StopwordFilter,
    extractor: LineExtractor<'a>,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(station: &'a StationConfig, use_stopwords: bool) -> Self {
        let filter = if use_stopwords {
            StopwordFilter::for_station(station)
        } else {
            StopwordFilter::disabled()
        };
        Self {
            station,
            filter,
            extractor: LineExtractor::new(station),
        }
    }

    /// Classify and route a single non-blank line.
    fn process_line<W: Write>(
        &self,
        idx: usize,
        line: &Line<'_>,
        router: &mut OutputRouter<W>,
        summary: &mut RunSummary,
    ) -> Classification {
        if let Verdict::Reject { stopword } = self.filter.check(line) {
            tracing::debug!("line {}: rejected by stopword {stopword:?}", idx + 1);
            *summary.stopword_counts.entry(stopword.to_string()).or_default() += 1;
            let result = router.write_rejected(line.raw());
            summary.record_write(Stream::RejectLog, idx, result);
            return Classification::Rejected;
        }

        let dest = router.destination(line);
        let fields = self.extractor.extract(line.raw());
        let expected = self.station.headlines().len();
        if expected > 0 && fields.len() != expected {
            tracing::debug!(
                "line {}: {} fields, {expected} headlines",
                idx + 1,
                fields.len()
            );
            summary.field_count_mismatches += 1;
        }

        let row = router.format(&fields);
        if dest == Destination::Additional {
            summary.routed_additional += 1;
        }
        let result = router.write_processed(dest, &row);
        summary.record_write(dest.into(), idx, result);
        Classification::Processed
    }

    /// Run every line of `content` through the pipeline into `router`.
    ///
    /// Blank lines are skipped. Write failures are logged and counted but
    /// never stop processing.
    pub fn process<W: Write>(&self, content: &str, router: &mut OutputRouter<W>) -> RunSummary {
        let mut summary = RunSummary::default();
        for (idx, raw) in content.lines().enumerate() {
            let line = Line::new(raw);
            if line.is_blank() {
                summary.skipped_blank += 1;
                continue;
            }
            match self.process_line(idx, &line, router, &mut summary) {
                Classification::Rejected => summary.rejected += 1,
                Classification::Processed => summary.processed += 1,
            }
        }
        summary
    }

    /// Process `content` into the files described by `options`.
    ///
    /// Opens all output streams up front (failure is fatal), processes
    /// every line, then removes artefacts that carry no data and runs the
    /// column cleanup on the main output. A stream that fails its final
    /// flush is counted in `write_failures` and the run still completes.
    pub fn run(&self, content: &str, options: &RunOptions) -> Result<RunSummary> {
        let filter = options
            .additional_filter
            .as_deref()
            .and_then(AdditionalFilter::new);
        let paths = OutputPaths::new(
            &options.output,
            filter.as_ref().map(|_| options.additional_postfix.as_str()),
            &options.reject_dir,
            self.station.name(),
            options.date,
        );

        if let Some(filter) = &filter {
            tracing::info!("additional filter: {}", filter.pattern());
        }
        if self.filter.is_enabled() {
            tracing::info!("{} stopwords active", self.filter.len());
        } else {
            tracing::info!("stopword filtering disabled");
        }

        let mut router = OutputRouter::create(self.station, &paths, filter)?;
        let mut summary = self.process(content, &mut router);
        for (stream, e) in router.flush() {
            let path = paths.path(stream).unwrap_or(&paths.main);
            tracing::warn!("could not finish {stream} {}: {e}", path.display());
            summary.write_failures += 1;
        }
        drop(router);

        if let Some(additional) = &paths.additional {
            summary.additional_output = keep_if(additional, |lines| lines > 1);
        }
        summary.reject_log = keep_if(&paths.reject_log, |lines| lines > 0);
        summary.main_output = keep_if(&paths.main, |lines| lines > 0);

        if options.cleanup
            && let Some(main) = &summary.main_output
            && main.is_file()
            && line_count(main).is_ok_and(|lines| lines > 1)
        {
            match cleanup::clean_columns(main, self.station.output_separator()) {
                Ok(report) => summary.cleanup = Some(report),
                Err(e) => tracing::warn!("{e}"),
            }
        }

        tracing::info!(
            "run complete: {} processed, {} rejected",
            summary.processed,
            summary.rejected
        );
        Ok(summary)
    }
}

/// Number of line terminators in the file.
fn line_count(path: &Path) -> io::Result<usize> {
    Ok(fs::read(path)?.iter().filter(|&&b| b == b'\n').count())
}

/// Keep `path` if `keep(line_count)` holds, otherwise delete it.
///
/// Zero-byte files always have a line count of zero. Anything that is not
/// a regular file (a device, a pipe) is kept without being inspected.
fn keep_if(path: &Path, keep: impl Fn(usize) -> bool) -> Option<PathBuf> {
    if path.exists() && !path.is_file() {
        return Some(path.to_path_buf());
    }
    let lines = match line_count(path) {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!("could not inspect {}: {e}", path.display());
            return None;
        }
    };
    if keep(lines) {
        return Some(path.to_path_buf());
    }
    match fs::remove_file(path) {
        Ok(()) => tracing::info!("removed empty file {}", path.display()),
        Err(e) => tracing::warn!("could not remove {}: {e}", path.display()),
    }
    None
}
