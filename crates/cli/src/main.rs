//! landchange CLI - land-cover change detection between two scenes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use landchange_algorithms::classification::ProbabilisticClassifier;
use landchange_core::io::read_band_stack;
use landchange_core::{Aoi, Band, BAND_COUNT};
use landchange_detector::{
    ChangeDetector, DetectorConfig, DetectorError, ErrorReport, ModelPair, TrainingParams,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "landchange")]
#[command(author, version, about = "Land-cover change detection", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect changes between a before and an after scene
    Analyze {
        /// Before scene (4-band GeoTIFF: R, G, B, NIR)
        #[arg(long)]
        before: PathBuf,
        /// After scene, co-registered with the before scene
        #[arg(long)]
        after: PathBuf,
        /// Area of interest as west,south,east,north in the scene CRS
        #[arg(long, conflicts_with = "aoi")]
        bbox: Option<String>,
        /// Area of interest as a GeoJSON polygon file
        #[arg(long)]
        aoi: Option<PathBuf>,
        /// Job id (default: random 8-character id)
        #[arg(long)]
        job_id: Option<String>,
        /// Model directory
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
        /// Root of the per-job output directories
        #[arg(long, default_value = "outputs")]
        out_dir: PathBuf,
    },
    /// Train and persist the synthetic model pair
    Train {
        /// Model directory
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
        /// Retrain even when usable models exist
        #[arg(long)]
        force: bool,
        /// Trees per forest
        #[arg(long, default_value = "100")]
        trees: usize,
    },
    /// Show information about a band stack
    Info {
        /// Input GeoTIFF
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_bbox(s: &str) -> Result<Aoi> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().with_context(|| format!("Invalid bbox value: {}", p)))
        .collect::<Result<Vec<_>>>()?;
    match parts.as_slice() {
        [west, south, east, north] => {
            Aoi::from_bounds(*west, *south, *east, *north).context("Invalid bbox")
        }
        _ => anyhow::bail!("bbox must be 'west,south,east,north', got: {}", s),
    }
}

fn read_aoi(path: &Path) -> Result<Aoi> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read AOI file {}", path.display()))?;
    Aoi::from_geojson(&text).context("Invalid AOI")
}

/// Print the error as `{kind, message}` JSON on stdout and exit non-zero
fn fail(err: &DetectorError) -> ! {
    let report = ErrorReport::from(err);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
    std::process::exit(1)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            before,
            after,
            bbox,
            aoi,
            job_id,
            model_dir,
            out_dir,
        } => {
            let aoi = match (bbox, aoi) {
                (Some(bbox), _) => Some(parse_bbox(&bbox)?),
                (None, Some(path)) => Some(read_aoi(&path)?),
                (None, None) => None,
            };

            let pb = spinner("Loading change models...");
            let detector = ChangeDetector::new(DetectorConfig::new(model_dir, out_dir));
            pb.finish_and_clear();
            let detector = detector.unwrap_or_else(|e| fail(&e));
            info!("Models: {:?}", detector.model_source());

            let start = Instant::now();
            let pb = spinner("Detecting changes...");
            let report = detector.run_on_pair(&before, &after, aoi.as_ref(), job_id.as_deref());
            pb.finish_and_clear();
            let report = report.unwrap_or_else(|e| fail(&e));
            info!("Processing time: {:.2?}", start.elapsed());

            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Train {
            model_dir,
            force,
            trees,
        } => {
            let params = TrainingParams {
                n_trees: trees,
                ..TrainingParams::default()
            };
            let start = Instant::now();
            let pb = spinner("Training change models...");
            let result = if force {
                ModelPair::train(&params).and_then(|pair| pair.save(&model_dir).map(|_| pair))
            } else {
                ModelPair::load_or_train(&model_dir, &params).map(|(pair, _)| pair)
            };
            pb.finish_and_clear();
            let pair = result.unwrap_or_else(|e| fail(&e));

            println!("Models saved to: {}", model_dir.display());
            println!(
                "  Classifier: {} categories x {} features",
                pair.classifier.n_outputs(),
                pair.classifier.n_features()
            );
            println!(
                "  Regressor: {} targets x {} features",
                pair.regressor.n_outputs(),
                pair.regressor.n_features()
            );
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Info { input } => {
            let pb = spinner("Reading band stack...");
            let stack = read_band_stack(&input).context("Failed to read band stack");
            pb.finish_and_clear();
            let stack = stack?;
            let (bands, rows, cols) = stack.shape();
            let bounds = stack.bounds();
            let transform = stack.transform();

            println!("File: {}", input.display());
            println!("Bands: {}", bands);
            println!("Dimensions: {} x {} ({} cells)", cols, rows, stack.len());
            println!(
                "Pixel size: {} x {}",
                transform.pixel_width, transform.pixel_height
            );
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = stack.crs() {
                println!("CRS: {}", crs);
            }

            for (i, band) in stack.bands().iter().enumerate() {
                let name = if bands == BAND_COUNT {
                    Band::ALL[i].name().to_string()
                } else {
                    format!("Band {}", i + 1)
                };
                let stats = band.statistics();
                println!("\n{}:", name);
                if let Some(min) = stats.min {
                    println!("  Min: {:.4}", min);
                }
                if let Some(max) = stats.max {
                    println!("  Max: {:.4}", max);
                }
                if let Some(mean) = stats.mean {
                    println!("  Mean: {:.4}", mean);
                }
                println!(
                    "  Valid cells: {} ({:.1}%)",
                    stats.valid_count,
                    100.0 * stats.valid_count as f64 / band.len().max(1) as f64
                );
            }
        }
    }

    Ok(())
}
