//! Input discovery, backup and reading.
//!
//! Station logs are picked up from a directory by extension, copied into a
//! timestamped backup directory, decoded, and concatenated into a single
//! text with each file's header lines removed.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use encoding_rs::WINDOWS_1252;

use crate::error::{FormatterError, Result};
use crate::station::StationConfig;

const UTF8_BOM: &str = "\u{feff}";

/// Default directory for input backups.
pub const DEFAULT_BACKUP_DIR: &str = "backup";

/// Subdirectory name format for one backup, e.g. `20251001_103000`.
const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Files in `dir` whose name contains one of the station's extensions.
///
/// Matching is case-insensitive. `exclude` (normally the output file) is
/// never returned. Results are sorted by name so runs are repeatable.
pub fn find_input_files(
    dir: &Path,
    station: &StationConfig,
    exclude: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let extensions: Vec<String> = station
        .extensions()
        .iter()
        .map(|ext| ext.to_lowercase())
        .collect();
    let exclude_name = exclude.and_then(Path::file_name);

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if Some(name) == exclude_name {
            continue;
        }
        let name = name.to_string_lossy().to_lowercase();
        if extensions.iter().any(|ext| name.contains(ext.as_str())) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(FormatterError::NoInputFiles {
            dir: dir.to_path_buf(),
        });
    }
    files.sort();
    Ok(files)
}

/// Decode file contents as UTF-8, falling back to Windows-1252.
///
/// The fallback maps every byte to exactly one codepoint, which keeps
/// fixed-width column offsets intact for legacy single-byte exports.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix(UTF8_BOM).unwrap_or(text)),
        Err(_) => Cow::Owned(WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()),
    }
}

/// Copy `files` into `<root>/<YYYYmmdd_HHMMSS>/` and return that directory.
///
/// Files keep their names. Any failure to create the directory or copy a
/// file is fatal, so a run never starts without its backup.
pub fn backup_files(files: &[PathBuf], root: &Path, stamp: NaiveDateTime) -> Result<PathBuf> {
    let dir = root.join(stamp.format(BACKUP_STAMP_FORMAT).to_string());
    fs::create_dir_all(&dir).map_err(|source| FormatterError::Backup {
        path: dir.clone(),
        source,
    })?;

    for path in files {
        let Some(name) = path.file_name() else {
            continue;
        };
        let dest = dir.join(name);
        fs::copy(path, &dest).map_err(|source| FormatterError::Backup {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("backed up {} -> {}", path.display(), dest.display());
    }

    tracing::info!("backup created: {}", dir.display());
    Ok(dir)
}

/// Read, decode and concatenate `files`, dropping the station's header lines.
///
/// Every line of the result ends with `\n`. An unreadable file is fatal.
pub fn read_input(files: &[PathBuf], station: &StationConfig) -> Result<String> {
    let mut joined = String::new();

    for (idx, path) in files.iter().enumerate() {
        let bytes = fs::read(path).map_err(|source| FormatterError::ReadInput {
            path: path.clone(),
            source,
        })?;
        let text = decode(&bytes);
        if matches!(text, Cow::Owned(_)) {
            tracing::info!("{}: not UTF-8, read as Windows-1252", path.display());
        }

        let mut count = 0;
        for line in text.lines().skip(station.skip_lines()) {
            joined.push_str(line);
            joined.push('\n');
            count += 1;
        }
        tracing::info!(
            "[{}/{}] read {} ({count} lines)",
            idx + 1,
            files.len(),
            path.display()
        );
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationDef;

    fn station(extensions: &[&str], has_headlines: bool) -> StationConfig {
        let def = StationDef {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            has_headlines,
            ..StationDef::default()
        };
        StationConfig::from_def("test", def, &[]).unwrap()
    }

    #[test]
    fn test_decode_utf8_strips_bom() {
        let text = decode("\u{feff}Æble;Sang".as_bytes());
        assert_eq!(text, "Æble;Sang");
        assert!(matches!(text, Cow::Borrowed(_)));
    }

    #[test]
    fn test_decode_falls_back_to_cp1252() {
        // "Blå" in Latin-1 followed by a Windows-1252 euro sign
        let bytes = [b'B', b'l', 0xe5, b' ', 0x80];
        let text = decode(&bytes);
        assert_eq!(text, "Blå €");
        assert_eq!(text.chars().count(), bytes.len());
    }

    #[test]
    fn test_decode_cp1252_is_one_char_per_byte() {
        // Bytes unassigned in Windows-1252 still decode to one codepoint.
        let bytes = [0x81, b'a', 0x9d, 0xff];
        let text = decode(&bytes);
        assert_eq!(text.chars().count(), bytes.len());
        assert!(text.ends_with('ÿ'));
    }

    #[test]
    fn test_backup_copies_into_timestamped_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("playlist.csv");
        fs::write(&input, "a;b\n").unwrap();
        let stamp = chrono::NaiveDate::from_ymd_opt(2025, 10, 1)
            .unwrap()
            .and_hms_opt(10, 30, 5)
            .unwrap();

        let backup = backup_files(&[input.clone()], &dir.path().join("backup"), stamp).unwrap();

        assert_eq!(backup, dir.path().join("backup").join("20251001_103005"));
        assert_eq!(
            fs::read_to_string(backup.join("playlist.csv")).unwrap(),
            "a;b\n"
        );
        assert!(input.exists());
    }

    #[test]
    fn test_backup_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = chrono::NaiveDate::from_ymd_opt(2025, 10, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let err = backup_files(&[dir.path().join("gone.csv")], dir.path(), stamp).unwrap_err();
        assert!(matches!(err, FormatterError::Backup { .. }));
    }

    #[test]
    fn test_find_input_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.TXT"), "x").unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        fs::write(dir.path().join("notes.md"), "x").unwrap();
        fs::write(dir.path().join("report.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("dir.txt")).unwrap();

        let files = find_input_files(
            dir.path(),
            &station(&[".txt"], false),
            Some(Path::new("report.txt")),
        )
        .unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.TXT"]);
    }

    #[test]
    fn test_find_input_files_none_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_input_files(dir.path(), &station(&[".dat"], false), None).unwrap_err();
        assert!(matches!(err, FormatterError::NoInputFiles { .. }));
    }

    #[test]
    fn test_read_input_skips_header_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("1.csv");
        let second = dir.path().join("2.csv");
        fs::write(&first, "Date;Title\r\na;1\r\nb;2").unwrap();
        fs::write(&second, "Date;Title\nc;3\n").unwrap();

        let text = read_input(&[first, second], &station(&[".csv"], true)).unwrap();
        assert_eq!(text, "a;1\nb;2\nc;3\n");
    }

    #[test]
    fn test_read_input_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_input(
            &[dir.path().join("gone.csv")],
            &station(&[".csv"], false),
        )
        .unwrap_err();
        assert!(matches!(err, FormatterError::ReadInput { .. }));
    }
}
