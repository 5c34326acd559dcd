//! Error types for the formatter.
//!
//! Only setup-level failures are errors. Per-line write failures are logged
//! and counted by the driver instead of aborting the run.

use std::path::PathBuf;

/// Errors that abort a formatter run.
#[derive(thiserror::Error, Debug)]
pub enum FormatterError {
    /// The requested station key or alias is not in the station table.
    #[error("'{0}' is not a valid station or alias")]
    UnknownStation(String),

    /// A station definition failed validation.
    #[error("invalid station '{station}': {reason}")]
    StationConfig { station: String, reason: String },

    /// The station table could not be parsed.
    #[error("station table parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// An input file could not be read.
    #[error("could not read input file '{}': {source}", path.display())]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No input file matched the station's extensions.
    #[error("no eligible input files found in '{}'", dir.display())]
    NoInputFiles { dir: PathBuf },

    /// One of the output streams could not be created.
    #[error("could not create output file '{}': {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An input file could not be copied into the backup directory.
    #[error("could not back up '{}': {source}", path.display())]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The column cleanup step failed to rewrite the main output.
    #[error("column cleanup failed for '{}': {source}", path.display())]
    Cleanup { path: PathBuf, source: csv::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatterError>;
