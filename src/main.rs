use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use log::{info, warn};

use navrun_import::activity::ImportedActivity;
use navrun_import::{
    ImportConfig, ImportOutcome, LogMonitor, ProgressMonitor, SystemPorts, import_image,
    read_device,
};

/// Read the workouts stored on a NavRun 500 watch.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Configuration file
    #[arg(short, long, default_value = "navrun-import.toml")]
    config: PathBuf,

    /// Probe only this serial port
    #[arg(short, long)]
    port: Option<String>,

    /// Decode a saved memory image instead of reading the watch
    #[arg(short, long, conflicts_with = "port")]
    image: Option<PathBuf>,

    /// Write the raw memory image read from the watch to this file
    #[arg(long, conflicts_with = "image")]
    save_raw: Option<PathBuf>,

    /// Print the imported activities as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_default_env()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let mut config = ImportConfig::load(&cli.config)?;
    if cli.port.is_some() {
        config.port = cli.port.clone();
    }

    let mut monitor = LogMonitor::default();
    let image = match &cli.image {
        Some(path) => std::fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => match read_device(&mut SystemPorts, &config, &mut monitor) {
            Ok(image) => image.into_inner(),
            Err(e) => {
                monitor.set_error_text(&e.to_string());
                bail!("{}", ImportOutcome::from(&e));
            }
        },
    };

    if let Some(path) = &cli.save_raw {
        match std::fs::write(path, &image) {
            Ok(()) => info!("raw image written to {}", path.display()),
            Err(e) => warn!("could not write {}: {e}", path.display()),
        }
    }

    let mut results: Vec<ImportedActivity> = Vec::new();
    let outcome = import_image(&image, &mut monitor, &mut results);
    if !matches!(outcome, ImportOutcome::Imported { .. }) {
        bail!("{outcome}");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for a in &results {
            println!(
                "{}  {:>8.2} km  {:>9}  {:>4} bpm  {:>7.1} kcal  {} laps",
                a.start,
                a.total_distance.unwrap_or_default() / 1000.0,
                a.total_time.map(format_elapsed).unwrap_or_default(),
                a.average_heart_rate.unwrap_or_default(),
                a.total_calories.unwrap_or_default(),
                a.laps.len(),
            );
        }
    }
    info!("{outcome}");
    Ok(())
}

fn format_elapsed(d: chrono::TimeDelta) -> String {
    let s = d.num_seconds();
    format!("{}:{:02}:{:02}", s / 3600, s / 60 % 60, s % 60)
}
