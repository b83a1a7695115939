mod config;
mod correlate;
mod elements;
mod io;
mod predict;

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::correlate::{CorrelationError, CorrelationPipeline, RunSummary};
use crate::elements::{ElementError, ElementStore};
use crate::io::{DetectionReader, EnrichedWriter, OutputFormat};
use crate::predict::Sgp4Propagator;

#[derive(Parser)]
#[command(name = "hotspot-pass")]
#[command(about = "Match hotspot detections with the satellite passes that observed them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate detections with nearest, previous and next pass geometry
    Correlate {
        /// Element set file (consecutive two-line blocks)
        #[arg(short, long)]
        tle: PathBuf,
        /// Detections CSV, ordered by acquisition time per satellite
        #[arg(short, long)]
        detections: PathBuf,
        /// Output file, otherwise stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// YAML configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Stop after this many detections
        #[arg(short, long)]
        limit: Option<usize>,
        /// Override the configured minimum pass elevation (degrees)
        #[arg(long)]
        min_elevation: Option<f64>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
    /// Summarise an element set file
    Elements {
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Elements(#[from] ElementError),
    #[error("{0}")]
    Correlation(#[from] CorrelationError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Correlate {
            tle,
            detections,
            output,
            config,
            limit,
            min_elevation,
            format,
        } => correlate(
            &tle,
            &detections,
            output.as_deref(),
            config.as_deref(),
            limit,
            min_elevation,
            format,
        )
        .map(|_| ()),
        Commands::Elements { file, config } => list_elements(&file, config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(p) => Config::from_file(p),
        None => Ok(Config::default()),
    }
}

fn correlate(
    tle: &Path,
    detections: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
    limit: Option<usize>,
    min_elevation: Option<f64>,
    format: OutputFormat,
) -> Result<RunSummary, AppError> {
    let mut config = load_config(config)?;
    if let Some(min) = min_elevation {
        config.min_elevation_deg = min;
        config.validate()?;
    }
    log::info!(
        "Correlating {} with {} (min elevation {}deg, window +/-{}h)",
        detections.display(),
        tle.display(),
        config.min_elevation_deg,
        config.window_half_width.num_hours()
    );

    let store = ElementStore::load(tle)?;
    let reader = DetectionReader::new(BufReader::new(File::open(detections)?))?;
    let headers = reader.headers();

    let out: Box<dyn Write> = match output {
        Some(path) => {
            backup_existing(path)?;
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    let mut writer = EnrichedWriter::new(out, format, headers)?;

    let mut pipeline = CorrelationPipeline::new(
        store,
        config.catalog(),
        Sgp4Propagator::new(),
        config.pipeline_settings(limit),
    );
    let summary = pipeline.run(reader.detections(), |c| writer.write(&c.record))?;
    writer.finish()?;
    Ok(summary)
}

/// Keep a previous output file as `<name>.bak`.
fn backup_existing(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        let mut backup = path.as_os_str().to_owned();
        backup.push(".bak");
        log::info!("Moving existing {} aside", path.display());
        fs::rename(path, backup)?;
    }
    Ok(())
}

fn list_elements(path: &Path, config: Option<&Path>) -> Result<(), AppError> {
    let config = load_config(config)?;
    let store = ElementStore::load(path)?;
    let catalog = config.catalog();

    println!("{} element sets", store.set_count());
    for timeline in store.timelines() {
        let names: Vec<_> = catalog
            .iter()
            .filter(|(_, id)| *id == timeline.catalog_id())
            .map(|(name, _)| name)
            .collect();
        let epochs = match (timeline.first_epoch(), timeline.last_epoch()) {
            (Some(first), Some(last)) => format!("{} .. {}", first, last),
            _ => "no epochs".to_string(),
        };
        println!(
            "  {:>5} {:<12} {:>6} sets  {}",
            timeline.catalog_id(),
            names.join(","),
            timeline.len(),
            epochs
        );
    }
    Ok(())
}
