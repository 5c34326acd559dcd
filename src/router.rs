//! Output routing.
//!
//! Every run writes up to three CSV streams: the main report, an optional
//! "additional" report for lines matching an operator-supplied filter, and
//! the rejection log. All streams start with the same header row so they
//! line up column for column.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

use crate::error::{FormatterError, Result};
use crate::line::Line;
use crate::station::StationConfig;

/// Postfix inserted before the extension of the additional output file.
pub const DEFAULT_ADDITIONAL_POSTFIX: &str = "_additional";

/// Line terminator used for every output row.
pub const LINE_TERMINATOR: &str = "\n";

/// One of the three output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Main,
    Additional,
    RejectLog,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stream::Main => "main output",
            Stream::Additional => "additional output",
            Stream::RejectLog => "rejection log",
        };
        f.write_str(name)
    }
}

/// Where a processed line goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Main,
    Additional,
}

impl From<Destination> for Stream {
    fn from(dest: Destination) -> Self {
        match dest {
            Destination::Main => Stream::Main,
            Destination::Additional => Stream::Additional,
        }
    }
}

/// Case-insensitive substring filter selecting lines for the additional output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalFilter {
    pattern: String,
    lower: String,
}

impl AdditionalFilter {
    /// `None` for an empty pattern, which means additional routing is off.
    pub fn new(pattern: &str) -> Option<Self> {
        if pattern.is_empty() {
            return None;
        }
        Some(Self {
            pattern: pattern.to_string(),
            lower: pattern.to_lowercase(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True if the full line contains the pattern, ignoring case.
    pub fn matches(&self, line: &Line<'_>) -> bool {
        line.lower().contains(self.lower.as_str())
    }
}

/// File locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub main: PathBuf,
    pub additional: Option<PathBuf>,
    pub reject_log: PathBuf,
}

impl OutputPaths {
    pub fn new(
        main: &Path,
        additional_postfix: Option<&str>,
        reject_dir: &Path,
        station_name: &str,
        date: NaiveDate,
    ) -> Self {
        Self {
            main: main.to_path_buf(),
            additional: additional_postfix.map(|postfix| additional_path(main, postfix)),
            reject_log: reject_log_path(reject_dir, station_name, date),
        }
    }

    pub fn path(&self, stream: Stream) -> Option<&Path> {
        match stream {
            Stream::Main => Some(&self.main),
            Stream::Additional => self.additional.as_deref(),
            Stream::RejectLog => Some(&self.reject_log),
        }
    }
}

/// `<dir>/<stem><postfix><.ext>` next to the main output.
pub fn additional_path(main: &Path, postfix: &str) -> PathBuf {
    let stem = main
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match main.extension() {
        Some(ext) => format!("{stem}{postfix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{postfix}"),
    };
    main.with_file_name(name)
}

/// `<dir>/<Y>-<M>-<D>-reject-<station>.csv`, without zero padding.
pub fn reject_log_path(dir: &Path, station_name: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!(
        "{}-{}-{}-reject-{station_name}.csv",
        date.year(),
        date.month(),
        date.day()
    ))
}

/// Join fields with the separator and terminate the line.
pub fn format_line(fields: &[String], separator: char) -> String {
    let mut out = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum::<usize>() + 1);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(field);
    }
    out.push_str(LINE_TERMINATOR);
    out
}

fn write_header<W: Write>(writer: &mut W, header: &str) -> io::Result<()> {
    writer.write_all(header.as_bytes())?;
    writer.write_all(LINE_TERMINATOR.as_bytes())
}

/// Decides the destination of each line and writes it there.
pub struct OutputRouter<W: Write> {
    separator: char,
    main: W,
    additional: Option<(AdditionalFilter, W)>,
    rejects: W,
}

impl<W: Write> OutputRouter<W> {
    /// Wrap already-open writers and write the header row to each.
    pub fn new(
        station: &StationConfig,
        mut main: W,
        additional: Option<(AdditionalFilter, W)>,
        mut rejects: W,
    ) -> io::Result<Self> {
        let header = station.header_line();
        write_header(&mut main, &header)?;
        write_header(&mut rejects, &header)?;
        let additional = match additional {
            Some((filter, mut writer)) => {
                write_header(&mut writer, &header)?;
                Some((filter, writer))
            }
            None => None,
        };
        Ok(Self {
            separator: station.output_separator(),
            main,
            additional,
            rejects,
        })
    }

    pub fn additional_filter(&self) -> Option<&AdditionalFilter> {
        self.additional.as_ref().map(|(filter, _)| filter)
    }

    /// Additional output if enabled and the line matches, else main output.
    pub fn destination(&self, line: &Line<'_>) -> Destination {
        match self.additional_filter() {
            Some(filter) if filter.matches(line) => Destination::Additional,
            _ => Destination::Main,
        }
    }

    /// Format `fields` as one output row.
    pub fn format(&self, fields: &[String]) -> String {
        format_line(fields, self.separator)
    }

    /// Write a formatted row to its destination.
    pub fn write_processed(&mut self, dest: Destination, row: &str) -> io::Result<()> {
        let writer = match (dest, self.additional.as_mut()) {
            (Destination::Additional, Some((_, writer))) => writer,
            _ => &mut self.main,
        };
        writer.write_all(row.as_bytes())
    }

    /// Append the original line, unmodified, to the rejection log.
    pub fn write_rejected(&mut self, raw: &str) -> io::Result<()> {
        self.rejects.write_all(raw.as_bytes())?;
        self.rejects.write_all(LINE_TERMINATOR.as_bytes())
    }

    /// Flush every stream, returning each stream that failed.
    ///
    /// A failing stream does not stop the others from being flushed.
    pub fn flush(&mut self) -> Vec<(Stream, io::Error)> {
        let mut failed = Vec::new();
        if let Err(e) = self.main.flush() {
            failed.push((Stream::Main, e));
        }
        if let Some((_, writer)) = self.additional.as_mut()
            && let Err(e) = writer.flush()
        {
            failed.push((Stream::Additional, e));
        }
        if let Err(e) = self.rejects.flush() {
            failed.push((Stream::RejectLog, e));
        }
        failed
    }

    /// Give back the writers as (main, additional, rejection log).
    pub fn into_inner(self) -> (W, Option<W>, W) {
        (
            self.main,
            self.additional.map(|(_, writer)| writer),
            self.rejects,
        )
    }
}

fn create_with_header(path: &Path, header: &str) -> Result<BufWriter<File>> {
    let create_err = |source| FormatterError::CreateOutput {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(create_err)?);
    write_header(&mut writer, header).map_err(create_err)?;
    Ok(writer)
}

impl OutputRouter<BufWriter<File>> {
    /// Create all output files, truncating existing ones.
    ///
    /// The rejection directory is created if missing. Failing to create any
    /// stream is fatal.
    pub fn create(
        station: &StationConfig,
        paths: &OutputPaths,
        filter: Option<AdditionalFilter>,
    ) -> Result<Self> {
        if let Some(dir) = paths.reject_log.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|source| FormatterError::CreateOutput {
                path: paths.reject_log.clone(),
                source,
            })?;
        }

        let header = station.header_line();
        let main = create_with_header(&paths.main, &header)?;
        let rejects = create_with_header(&paths.reject_log, &header)?;
        let additional = match (filter, paths.additional.as_deref()) {
            (Some(filter), Some(path)) => Some((filter, create_with_header(path, &header)?)),
            _ => None,
        };

        Ok(Self {
            separator: station.output_separator(),
            main,
            additional,
            rejects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationDef;

    fn station(separator: &str) -> StationConfig {
        let def = StationDef {
            separator: Some(separator.to_string()),
            headlines: vec!["Date".into(), "Time".into(), "Track Title".into()],
            ..StationDef::default()
        };
        StationConfig::from_def("test", def, &[]).unwrap()
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_headers_written_to_all_streams() {
        let filter = AdditionalFilter::new("Boulevard").unwrap();
        let router =
            OutputRouter::new(&station(";"), Vec::new(), Some((filter, Vec::new())), Vec::new())
                .unwrap();
        let (main, additional, rejects) = router.into_inner();
        assert_eq!(text(main), "Date;Time;Track Title\n");
        assert_eq!(text(additional.unwrap()), "Date;Time;Track Title\n");
        assert_eq!(text(rejects), "Date;Time;Track Title\n");
    }

    #[test]
    fn test_format_uses_station_separator() {
        let router = OutputRouter::new(&station(":"), Vec::new(), None, Vec::new()).unwrap();
        let row = router.format(&["a".to_string(), "".to_string(), "c".to_string()]);
        assert_eq!(row, "a::c\n");
    }

    #[test]
    fn test_destination_without_filter_is_main() {
        let router = OutputRouter::new(&station(";"), Vec::new(), None, Vec::new()).unwrap();
        assert_eq!(
            router.destination(&Line::new("Boulevard Show")),
            Destination::Main
        );
    }

    #[test]
    fn test_destination_with_matching_filter() {
        let filter = AdditionalFilter::new("BOULEVARD").unwrap();
        let router =
            OutputRouter::new(&station(";"), Vec::new(), Some((filter, Vec::new())), Vec::new())
                .unwrap();
        assert_eq!(
            router.destination(&Line::new("01-10-2025;Boulevard Show;X")),
            Destination::Additional
        );
        assert_eq!(
            router.destination(&Line::new("01-10-2025;Morning;X")),
            Destination::Main
        );
    }

    #[test]
    fn test_rows_go_to_exactly_one_stream() {
        let filter = AdditionalFilter::new("show").unwrap();
        let mut router =
            OutputRouter::new(&station(";"), Vec::new(), Some((filter, Vec::new())), Vec::new())
                .unwrap();
        router.write_processed(Destination::Main, "main-row\n").unwrap();
        router
            .write_processed(Destination::Additional, "extra-row\n")
            .unwrap();
        router.write_rejected("Friday Jingle").unwrap();
        let (main, additional, rejects) = router.into_inner();
        let (main, additional, rejects) = (text(main), text(additional.unwrap()), text(rejects));
        assert!(main.ends_with("main-row\n") && !main.contains("extra-row"));
        assert!(additional.ends_with("extra-row\n") && !additional.contains("main-row"));
        assert!(rejects.ends_with("Friday Jingle\n"));
    }

    /// Buffers writes, fails every flush.
    struct Unflushable(Vec<u8>);

    impl Write for Unflushable {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::StorageFull, "no space left"))
        }
    }

    #[test]
    fn test_flush_reports_every_failing_stream() {
        let filter = AdditionalFilter::new("show").unwrap();
        let mut router = OutputRouter::new(
            &station(";"),
            Unflushable(Vec::new()),
            Some((filter, Unflushable(Vec::new()))),
            Unflushable(Vec::new()),
        )
        .unwrap();
        let failed: Vec<Stream> = router.flush().into_iter().map(|(s, _)| s).collect();
        assert_eq!(
            failed,
            vec![Stream::Main, Stream::Additional, Stream::RejectLog]
        );
    }

    #[test]
    fn test_empty_filter_disables_routing() {
        assert!(AdditionalFilter::new("").is_none());
    }

    #[test]
    fn test_additional_path() {
        assert_eq!(
            additional_path(Path::new("out/report.csv"), "_additional"),
            PathBuf::from("out/report_additional.csv")
        );
        assert_eq!(
            additional_path(Path::new("report"), "-boulevard"),
            PathBuf::from("report-boulevard")
        );
    }

    #[test]
    fn test_reject_log_path_is_unpadded() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(
            reject_log_path(Path::new("rejected"), "Globus", date),
            PathBuf::from("rejected/2025-3-7-reject-Globus.csv")
        );
    }

    #[test]
    fn test_create_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(
            &dir.path().join("missing/sub/report.csv"),
            None,
            dir.path(),
            "Test",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        let err = OutputRouter::create(&station(";"), &paths, None)
            .err()
            .unwrap();
        assert!(matches!(err, FormatterError::CreateOutput { .. }));
    }

    #[test]
    fn test_create_makes_reject_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::new(
            &dir.path().join("report.csv"),
            Some(DEFAULT_ADDITIONAL_POSTFIX),
            &dir.path().join("rejected"),
            "Test",
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        let filter = AdditionalFilter::new("x");
        let mut router = OutputRouter::create(&station(";"), &paths, filter).unwrap();
        assert!(router.flush().is_empty());
        assert!(paths.reject_log.exists());
        assert!(paths.additional.as_ref().unwrap().exists());
        assert_eq!(
            fs::read_to_string(&paths.main).unwrap(),
            "Date;Time;Track Title\n"
        );
    }
}
