//! stay-locator CLI - run stay extraction and mobility analysis on JSON samples
//!
//! Usage:
//!   stay-locator stays <samples.json> [--output <file>] [--min-stay <minutes>] [--roaming <meters>]
//!   stay-locator analyze <samples.json> [--config <config.json>] [--max-distance-meters <m>] [--output <file>]
//!
//! The input file holds a JSON array of rows
//! `{"entity_id": .., "timestamp": .., "latitude": .., "longitude": ..}`
//! with unix timestamps in seconds. Results are written as JSON to stdout
//! or to `--output`.

use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stay_locator::{
    analyze, process_all_entities_with, AgglomerativeClusterer, Dataset, FailurePolicy,
    LinkageMethod, LogProgress, MobilityConfig, Result, SampleRow, StayError,
};

#[derive(Parser)]
#[command(name = "stay-locator")]
#[command(about = "Stay-point extraction and destination analysis for GPS traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract stay locations for every entity
    Stays {
        /// JSON file with sample rows
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Stays, destinations and radius of gyration
    Analyze {
        /// JSON file with sample rows
        input: PathBuf,

        #[command(flatten)]
        common: CommonArgs,

        /// Linkage method (single, complete, average, weighted, ward)
        #[arg(long)]
        linkage: Option<LinkageMethod>,

        /// Maximum linkage distance inside one destination, in meters
        #[arg(long)]
        max_distance_meters: Option<f64>,

        /// Only use the k most visited destinations for gyration
        #[arg(short)]
        k: Option<usize>,

        /// Weight all destinations equally for gyration
        #[arg(long)]
        ignore_weights: bool,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file (MobilityConfig layout)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum stay duration in minutes
    #[arg(long)]
    min_stay: Option<f64>,

    /// Roaming distance in meters
    #[arg(long)]
    roaming: Option<f64>,

    /// Number of entities processed concurrently
    #[arg(short, long)]
    parallelism: Option<usize>,

    /// Skip failing entities instead of aborting
    #[arg(long)]
    skip_failures: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Stays { input, common } => run_stays(&input, &common),
        Commands::Analyze {
            input,
            common,
            linkage,
            max_distance_meters,
            k,
            ignore_weights,
        } => {
            let overrides = AnalyzeOverrides {
                linkage,
                max_distance_meters,
                k,
                ignore_weights,
            };
            run_analyze(&input, &common, &overrides)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

struct AnalyzeOverrides {
    linkage: Option<LinkageMethod>,
    max_distance_meters: Option<f64>,
    k: Option<usize>,
    ignore_weights: bool,
}

/// Config file first, then command line overrides
fn load_config(common: &CommonArgs) -> Result<MobilityConfig> {
    let mut config = match &common.config {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            serde_json::from_reader(reader)?
        }
        None => MobilityConfig::default(),
    };

    if let Some(minutes) = common.min_stay {
        config.batch.stay.min_stay_duration_minutes = minutes;
    }
    if let Some(meters) = common.roaming {
        config.batch.stay.roaming_distance_meters = meters;
    }
    if let Some(parallelism) = common.parallelism {
        config.batch.parallelism = parallelism;
    }
    if common.skip_failures {
        config.batch.failure_policy = FailurePolicy::SkipAndReport;
    }

    Ok(config)
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path).map_err(|e| StayError::Io {
        message: format!("{}: {}", path.display(), e),
    })?);
    let rows: Vec<SampleRow> = serde_json::from_reader(reader)?;
    let dataset = Dataset::from_rows(rows);
    info!(
        "Loaded {} samples for {} entities from {}",
        dataset.sample_count(),
        dataset.entity_count(),
        path.display()
    );
    Ok(dataset)
}

fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn run_stays(input: &Path, common: &CommonArgs) -> Result<()> {
    let config = load_config(common)?;
    let dataset = load_dataset(input)?;

    let output = process_all_entities_with(&dataset, &config.batch, &LogProgress, None)?;
    for failure in &output.failures {
        eprintln!("Skipped {}: {}", failure.entity_id, failure.message);
    }

    write_json(&output, common.output.as_ref())
}

/// The config file stores the cluster distance in degrees; the flag takes meters.
fn apply_analyze_overrides(config: &mut MobilityConfig, overrides: &AnalyzeOverrides) {
    if let Some(linkage) = overrides.linkage {
        config.destinations.linkage = linkage;
    }
    if let Some(meters) = overrides.max_distance_meters {
        config.destinations.max_cluster_distance_degrees = stay_locator::meters_to_degrees(meters);
    }
    if let Some(k) = overrides.k {
        config.gyration.k = Some(k);
    }
    if overrides.ignore_weights {
        config.gyration.ignore_weights = true;
    }
}

fn run_analyze(input: &Path, common: &CommonArgs, overrides: &AnalyzeOverrides) -> Result<()> {
    let mut config = load_config(common)?;
    apply_analyze_overrides(&mut config, overrides);

    let dataset = load_dataset(input)?;
    let report = analyze(&dataset, &config, &AgglomerativeClusterer)?;

    match report.population_gyration {
        Some(r) => info!("Population radius of gyration: {:.1} m", r),
        None => info!("Population radius of gyration undefined"),
    }

    write_json(&report, common.output.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_analyze(args: &[&str]) -> (CommonArgs, AnalyzeOverrides) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Analyze {
                common,
                linkage,
                max_distance_meters,
                k,
                ignore_weights,
                ..
            } => (
                common,
                AnalyzeOverrides {
                    linkage,
                    max_distance_meters,
                    k,
                    ignore_weights,
                },
            ),
            Commands::Stays { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_max_distance_flag_is_meters() {
        let (common, overrides) = parse_analyze(&[
            "stay-locator",
            "analyze",
            "samples.json",
            "--max-distance-meters",
            "200",
            "--linkage",
            "ward",
            "-k",
            "3",
        ]);
        let mut config = load_config(&common).unwrap();
        apply_analyze_overrides(&mut config, &overrides);

        let expected = stay_locator::meters_to_degrees(200.0);
        assert!((config.destinations.max_cluster_distance_degrees - expected).abs() < 1e-12);
        assert_eq!(config.destinations.linkage, LinkageMethod::Ward);
        assert_eq!(config.gyration.k, Some(3));
    }

    #[test]
    fn test_old_max_distance_flag_rejected() {
        let result = Cli::try_parse_from(["stay-locator", "analyze", "samples.json", "--max-distance", "200"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_common_overrides() {
        let (common, _) = parse_analyze(&[
            "stay-locator",
            "analyze",
            "samples.json",
            "--min-stay",
            "15",
            "--parallelism",
            "4",
            "--skip-failures",
        ]);
        let config = load_config(&common).unwrap();
        assert_eq!(config.batch.stay.min_stay_duration_minutes, 15.0);
        assert_eq!(config.batch.parallelism, 4);
        assert_eq!(config.batch.failure_policy, FailurePolicy::SkipAndReport);
    }
}
