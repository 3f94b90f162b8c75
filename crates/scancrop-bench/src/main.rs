//! scancrop-bench: CLI tool for cropping scans and inspecting diagnostics.
//!
//! Runs the color gate and contour cropper on a given image file with
//! configurable parameters, printing per-stage diagnostics. Useful for:
//!
//! - Checking why a scan was rejected or produced no region
//! - Tuning the threshold band and morphology iteration count
//! - Measuring per-stage durations
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin scancrop-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use scancrop_pipeline::diagnostics::{Clock, CropDiagnostics};
use scancrop_pipeline::{BgrImage, CropConfig, CropOutcome};
use tracing::{Level, error, info, warn};

/// Scan cropping and diagnostics for scancrop.
///
/// Runs the color gate and contour cropper on a given image and prints
/// per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "scancrop-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Lowest grayscale intensity counted as foreground.
    #[arg(long, default_value_t = CropConfig::DEFAULT_THRESHOLD_LOW)]
    threshold_low: u8,

    /// Highest grayscale intensity counted as foreground.
    #[arg(long, default_value_t = CropConfig::DEFAULT_THRESHOLD_HIGH)]
    threshold_high: u8,

    /// Erosion and dilation pass count.
    #[arg(long, default_value_t = CropConfig::DEFAULT_MORPH_ITERATIONS)]
    morph_iterations: u8,

    /// Full crop config as a JSON string.
    ///
    /// When provided, all other crop parameter flags are ignored.
    /// The JSON must be a valid `CropConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Write the crop to this path as PNG.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Log every pipeline stage.
    #[arg(long, short)]
    verbose: bool,
}

/// Build a [`CropConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<CropConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        CropConfig {
            threshold_low: cli.threshold_low,
            threshold_high: cli.threshold_high,
            morph_iterations: cli.morph_iterations,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let image = match scancrop_pipeline::grayscale::decode(&image_bytes) {
        Ok(image) => image,
        Err(e) => {
            error!("Error decoding {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        width = image.width(),
        height = image.height(),
        runs = cli.runs,
        "loaded image"
    );
    info!("Config: {config:?}");

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (outcome, diagnostics) =
            match scancrop_pipeline::crop::crop_with_diagnostics(&image, &config, &StdClock) {
                Ok(result) => result,
                Err(e) => {
                    error!("Pipeline error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        // Write the crop on the first run only.
        if run == 0
            && let Some(ref output) = cli.output
        {
            match outcome {
                CropOutcome::Cropped(ref crop) => write_crop(crop, output),
                CropOutcome::NoRegion(reason) => warn!("No crop written: {reason}"),
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Save a crop as PNG, logging instead of failing the run.
fn write_crop(crop: &BgrImage, path: &Path) {
    if crop.is_empty() {
        warn!(
            "Crop is {}x{}; nothing written to {}",
            crop.width(),
            crop.height(),
            path.display()
        );
        return;
    }
    match crop
        .to_rgb()
        .save_with_format(path, image::ImageFormat::Png)
    {
        Ok(()) => info!(
            "Crop written to {} ({}x{})",
            path.display(),
            crop.width(),
            crop.height()
        ),
        Err(e) => error!("Error writing crop to {}: {e}", path.display()),
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&CropDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[CropDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<16} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(32));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Color Gate", |d| Some(d.color_gate.duration)),
        ("Grayscale", |d| d.grayscale.as_ref().map(|s| s.duration)),
        ("Threshold", |d| d.threshold.as_ref().map(|s| s.duration)),
        ("Morphology", |d| d.morphology.as_ref().map(|s| s.duration)),
        ("Contours", |d| d.contours.as_ref().map(|s| s.duration)),
        ("Crop", |d| d.crop.as_ref().map(|s| s.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<16} {stage_mean:>10.3}ms");
    }
}
