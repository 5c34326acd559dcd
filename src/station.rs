//! Station configuration.
//!
//! Every station is described once in a [`StationTable`] (YAML, with a
//! builtin table compiled into the binary). Resolving a station by key or
//! alias yields a validated, immutable [`StationConfig`] that is passed by
//! reference to every pipeline component.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{FormatterError, Result};
use crate::transform::Transform;

/// The station table shipped with the crate.
const BUILTIN_STATIONS: &str = include_str!("../config/stations.yaml");

/// Default output field separator.
pub const DEFAULT_SEPARATOR: char = ';';

/// Raw station definition as written in the station table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationDef {
    /// Display name, used in file names. Defaults to the table key.
    pub name: Option<String>,
    pub aliases: Vec<String>,
    pub extensions: Vec<String>,
    pub positional: bool,
    pub positions: Vec<usize>,
    pub has_headlines: bool,
    /// Lines to skip at the top of each input file.
    /// Defaults to 1 when `has_headlines` is set, otherwise 0.
    pub skip_lines: Option<usize>,
    pub separator: Option<String>,
    pub input_separator: Option<String>,
    pub headlines: Vec<String>,
    pub stopwords: Vec<String>,
    pub transforms: Vec<Transform>,
}

/// How fields are cut out of a raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Fixed-width columns ending at the given codepoint offsets (ascending).
    Positional { cut_positions: Vec<usize> },
    /// Fields separated by a single character.
    Delimited { input_separator: char },
}

/// Validated, read-only parsing rules for one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    key: String,
    name: String,
    aliases: Vec<String>,
    extensions: Vec<String>,
    layout: Layout,
    has_headlines: bool,
    skip_lines: usize,
    output_separator: char,
    headlines: Vec<String>,
    stopwords: Vec<String>,
    transforms: Vec<Transform>,
}

fn single_char(station: &str, label: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(FormatterError::StationConfig {
            station: station.to_string(),
            reason: format!("{label} must be exactly one character, got {value:?}"),
        }),
    }
}

impl StationConfig {
    /// Validate a raw definition and merge in the shared default stopwords.
    ///
    /// Positional cut positions are sorted ascending here, so the extractor
    /// never sees a descending list.
    pub fn from_def(key: &str, def: StationDef, default_stopwords: &[String]) -> Result<Self> {
        let output_separator = match &def.separator {
            Some(sep) => single_char(key, "separator", sep)?,
            None => DEFAULT_SEPARATOR,
        };

        let layout = if def.positional {
            if def.positions.is_empty() {
                return Err(FormatterError::StationConfig {
                    station: key.to_string(),
                    reason: "positional station needs at least one position".to_string(),
                });
            }
            let mut cut_positions = def.positions;
            if !cut_positions.is_sorted() {
                tracing::debug!("station {key}: sorting cut positions {cut_positions:?}");
                cut_positions.sort_unstable();
            }
            Layout::Positional { cut_positions }
        } else {
            let input_separator = match &def.input_separator {
                Some(sep) => single_char(key, "input_separator", sep)?,
                None => output_separator,
            };
            Layout::Delimited { input_separator }
        };

        let stopwords = default_stopwords
            .iter()
            .chain(def.stopwords.iter())
            .filter(|word| !word.is_empty())
            .cloned()
            .collect();

        Ok(Self {
            key: key.to_lowercase(),
            name: def.name.unwrap_or_else(|| key.to_string()),
            aliases: def.aliases.iter().map(|a| a.to_lowercase()).collect(),
            extensions: def.extensions,
            layout,
            has_headlines: def.has_headlines,
            skip_lines: def
                .skip_lines
                .unwrap_or(if def.has_headlines { 1 } else { 0 }),
            output_separator,
            headlines: def.headlines,
            stopwords,
            transforms: def.transforms,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.layout, Layout::Positional { .. })
    }

    pub fn has_headlines(&self) -> bool {
        self.has_headlines
    }

    /// Number of leading lines dropped from each input file.
    pub fn skip_lines(&self) -> usize {
        self.skip_lines
    }

    pub fn output_separator(&self) -> char {
        self.output_separator
    }

    pub fn headlines(&self) -> &[String] {
        &self.headlines
    }

    /// Default stopwords followed by the station's own.
    pub fn stopwords(&self) -> &[String] {
        &self.stopwords
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// The header row shared by every output file of a run.
    pub fn header_line(&self) -> String {
        self.headlines.join(&self.output_separator.to_string())
    }
}

/// All known stations plus the stopwords shared between them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationTable {
    #[serde(default)]
    default_stopwords: Vec<String>,
    stations: BTreeMap<String, StationDef>,
}

impl StationTable {
    /// The table compiled into the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_STATIONS)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let mut table: StationTable = serde_yaml::from_str(text)?;
        table.stations = std::mem::take(&mut table.stations)
            .into_iter()
            .map(|(key, def)| (key.to_lowercase(), def))
            .collect();
        Ok(table)
    }

    /// Load a table from a YAML file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| FormatterError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn default_stopwords(&self) -> &[String] {
        &self.default_stopwords
    }

    /// Station keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.stations.keys().map(String::as_str)
    }

    /// Map a station name or alias (case-insensitive) to its table key.
    ///
    /// Direct keys take precedence over aliases.
    pub fn resolve_key(&self, name: &str) -> Option<&str> {
        let wanted = name.to_lowercase();
        if let Some((key, _)) = self.stations.get_key_value(&wanted) {
            return Some(key.as_str());
        }
        self.stations
            .iter()
            .find(|(_, def)| def.aliases.iter().any(|a| a.to_lowercase() == wanted))
            .map(|(key, _)| key.as_str())
    }

    /// Resolve and validate a station by key or alias.
    pub fn station(&self, name: &str) -> Result<StationConfig> {
        let key = self
            .resolve_key(name)
            .ok_or_else(|| FormatterError::UnknownStation(name.to_string()))?;
        let def = self.stations[key].clone();
        StationConfig::from_def(key, def, &self.default_stopwords)
    }
}
