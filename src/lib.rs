//! # komm-fmt
//!
//! Turns broadcast logs from radio stations into normalised CSV reports.
//!
//! Each station exports its playlist in its own raw format: fixed-width
//! columns or ad-hoc delimited text. This library cuts those lines into
//! fields, rejects unwanted lines (jingles, promos, DJ mixes) by stopword,
//! and writes a cleaned report plus a rejection log.
//!
//! ## Overview
//!
//! A run processes one line at a time:
//! - **Stopword filter**: reject fast on any case-insensitive substring hit
//! - **Extraction**: fixed-width slicing or delimited split, then per-station transforms
//! - **Routing**: main report, optional "additional" report, or rejection log
//!
//! ## Example
//!
//! ```
//! use komm_fmt::{OutputRouter, PipelineDriver, StationTable};
//!
//! let table = StationTable::builtin().unwrap();
//! let station = table.station("radio4").unwrap();
//!
//! let mut router = OutputRouter::new(&station, Vec::new(), None, Vec::new()).unwrap();
//! let input = "251001;103000;03:12;P4;x;Song;Band\n251001;104000;00:10;P4;x;Radio4 Ident;\n";
//! let summary = PipelineDriver::new(&station, true).process(input, &mut router);
//!
//! assert_eq!(summary.processed, 1);
//! assert_eq!(summary.rejected, 1);
//! ```

pub mod cleanup;
pub mod driver;
pub mod error;
pub mod extract;
pub mod input;
pub mod line;
pub mod router;
pub mod station;
pub mod stopword;
pub mod transform;

pub use cleanup::{CleanupReport, clean_columns};
pub use driver::{PipelineDriver, RunOptions, RunSummary};
pub use error::{FormatterError, Result};
pub use extract::{LineExtractor, slice_positional, split_delimited};
pub use input::{backup_files, find_input_files, read_input};
pub use line::{Classification, Line};
pub use router::{AdditionalFilter, Destination, OutputPaths, OutputRouter, Stream};
pub use station::{Layout, StationConfig, StationDef, StationTable};
pub use stopword::{StopwordFilter, Verdict};
pub use transform::Transform;
