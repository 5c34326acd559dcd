//! CLI tool to format a station's broadcast logs into a CSV report.
//!
//! Usage:
//!   komm-fmt <station> -o <output.csv>
//!   komm-fmt radio4 -o report.csv --additional=Boulevard
//!   komm-fmt bauer -o report.csv --no-backup
//!   komm-fmt --list-stations

use std::path::{Path, PathBuf};
use std::process;

use chrono::Local;
use clap::Parser;
use komm_fmt::driver::DEFAULT_REJECT_DIR;
use komm_fmt::input::DEFAULT_BACKUP_DIR;
use komm_fmt::router::DEFAULT_ADDITIONAL_POSTFIX;
use komm_fmt::{
    PipelineDriver, Result, RunOptions, RunSummary, StationTable, backup_files, find_input_files,
    read_input,
};
use tracing_subscriber::{EnvFilter, fmt};

/// Format broadcast logs from a radio station into a CSV report.
///
/// Input files are picked up from the input directory by the station's
/// file extensions. Lines matching a stopword go to a dated rejection log.
#[derive(Parser)]
#[command(name = "komm-fmt")]
struct Cli {
    /// Station name or alias (see --list-stations)
    #[arg(required_unless_present = "list_stations")]
    station: Option<String>,

    /// Main output file
    #[arg(short, long, required_unless_present = "list_stations")]
    output: Option<PathBuf>,

    /// Route lines containing this text to an additional CSV
    #[arg(long, value_name = "FILTER")]
    additional: Option<String>,

    /// Postfix for the additional output file name
    #[arg(long, value_name = "POSTFIX", default_value = DEFAULT_ADDITIONAL_POSTFIX)]
    additional_postfix: String,

    /// Disable stopword rejection entirely
    #[arg(long)]
    no_stopwords: bool,

    /// Directory for rejection logs
    #[arg(long, value_name = "DIR", default_value = DEFAULT_REJECT_DIR)]
    reject_dir: PathBuf,

    /// Directory to read station files from
    #[arg(long, value_name = "DIR", default_value = ".")]
    input_dir: PathBuf,

    /// Station table (YAML) to use instead of the builtin one
    #[arg(long, value_name = "FILE")]
    stations: Option<PathBuf>,

    /// Keep DELETE columns and empty rows in the main output
    #[arg(long)]
    no_cleanup: bool,

    /// Directory that receives a timestamped copy of the input files
    #[arg(long, value_name = "DIR", default_value = DEFAULT_BACKUP_DIR)]
    backup_dir: PathBuf,

    /// Skip copying the input files before processing
    #[arg(long)]
    no_backup: bool,

    /// List all stations and their aliases
    #[arg(long)]
    list_stations: bool,

    /// Log debug detail on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

fn print_stations(table: &StationTable) {
    println!("Available stations and aliases:");
    println!("{}", "-".repeat(40));
    for key in table.keys() {
        let station = match table.station(key) {
            Ok(station) => station,
            Err(e) => {
                println!("  {key}: {e}");
                continue;
            }
        };
        let layout = if station.is_positional() {
            "fixed-width"
        } else {
            "delimited"
        };
        let header = if station.has_headlines() {
            ", header row"
        } else {
            ""
        };
        if station.aliases().is_empty() {
            println!("  {key} ({layout}{header})");
        } else {
            println!(
                "  {key} ({layout}{header}): {}",
                station.aliases().join(", ")
            );
        }
        if !station.transforms().is_empty() {
            let names: Vec<&str> = station.transforms().iter().map(|t| t.name()).collect();
            println!("      transforms: {}", names.join(", "));
        }
    }
    if !table.default_stopwords().is_empty() {
        println!();
        println!("Default stopwords: {}", table.default_stopwords().join(", "));
    }
}

fn run(cli: &Cli, table: &StationTable, name: &str, output: &Path) -> Result<RunSummary> {
    let station = table.station(name)?;
    tracing::info!("station: {}", station.name());

    let files = find_input_files(&cli.input_dir, &station, Some(output))?;
    if !cli.no_backup {
        backup_files(&files, &cli.backup_dir, Local::now().naive_local())?;
    }
    let content = read_input(&files, &station)?;

    let options = RunOptions {
        additional_filter: cli.additional.clone(),
        additional_postfix: cli.additional_postfix.clone(),
        use_stopwords: !cli.no_stopwords,
        reject_dir: cli.reject_dir.clone(),
        cleanup: !cli.no_cleanup,
        ..RunOptions::new(output, Local::now().date_naive())
    };
    PipelineDriver::new(&station, options.use_stopwords).run(&content, &options)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let table = match &cli.stations {
        Some(path) => StationTable::load(path),
        None => StationTable::builtin(),
    };
    let table = match table {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if cli.list_stations {
        print_stations(&table);
        return;
    }

    let (Some(name), Some(output)) = (cli.station.as_deref(), cli.output.as_deref()) else {
        eprintln!("Error: a station and --output are required");
        process::exit(1);
    };

    match run(&cli, &table, name, output) {
        Ok(summary) => print!("{summary}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
