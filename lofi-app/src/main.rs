//! LOFI - song to lofi remix converter
//!
//! Removes the vocals from a song, slows it down towards a relaxed tempo and
//! renders it through a muffled, noisy effect chain.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lofi_audio::LofiProcessor;
use lofi_library::{BeatTracker, Config};
use lofi_stems::SpleeterSeparator;

mod pipeline;

use pipeline::{Pipeline, PipelineConfig};

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str =
    "lofi=info,lofi_audio=info,lofi_analysis=info,lofi_library=info,lofi_stems=info";

/// Command-line arguments for lofi
#[derive(Parser, Debug)]
#[command(name = "lofi")]
#[command(about = "Convert a song to a Lofi beat.")]
#[command(version)]
struct Args {
    /// The path to the song file to convert
    input_song: PathBuf,

    /// Manually set the slowdown factor (e.g., 0.85). Overrides automatic BPM detection
    #[arg(long = "slow_factor", allow_negative_numbers = true)]
    slow_factor: Option<f64>,

    /// The target BPM for the lofi track [default: 80, or the config file value]
    #[arg(long = "target_bpm")]
    target_bpm: Option<u32>,

    /// Treat the input as an instrumental and skip vocal separation
    #[arg(long)]
    instrumental: bool,

    /// Directory separated stems are written to
    #[arg(long = "output_dir", env = "LOFI_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Separation program to run
    #[arg(long, env = "LOFI_SEPARATOR")]
    separator: Option<PathBuf>,
}

impl Args {
    /// Settings for this run: CLI flags over config file values
    fn pipeline_config(&self, config: &Config) -> PipelineConfig {
        PipelineConfig {
            slow_factor: self.slow_factor,
            target_bpm: self.target_bpm.unwrap_or(config.target_bpm),
            instrumental: self.instrumental,
            ..PipelineConfig::new(&self.input_song)
        }
    }

    fn separator(&self, config: &Config) -> SpleeterSeparator {
        let program = self
            .separator
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.separator_program));
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone());
        SpleeterSeparator::new(program, config.separator_model.clone(), output_dir)
    }
}

/// Message printed when the input does not exist, `None` when it does
fn missing_input_message(path: &Path) -> Option<String> {
    if path.exists() {
        None
    } else {
        Some(format!("Error: Input file not found at {}", path.display()))
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    if let Some(message) = missing_input_message(&args.input_song) {
        println!("{}", message);
        return Ok(());
    }

    let config = Config::load();
    debug!(?config, "Loaded configuration");

    let separator = args.separator(&config);
    info!(
        "Stems from {} go to {}",
        separator.model(),
        separator.output_dir().display()
    );
    let tempo = BeatTracker::new();
    let renderer = LofiProcessor::new();

    let pipeline = Pipeline::new(&separator, &tempo, &renderer);
    let output = pipeline
        .run(&args.pipeline_config(&config))
        .with_context(|| format!("Failed to convert {}", args.input_song.display()))?;

    println!("\nDone! Check your folder for {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("lofi").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_missing_input_message() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp3");
        assert_eq!(
            missing_input_message(&missing),
            Some(format!("Error: Input file not found at {}", missing.display()))
        );

        let present = dir.path().join("song.mp3");
        std::fs::write(&present, b"x").unwrap();
        assert_eq!(missing_input_message(&present), None);
    }

    #[test]
    fn test_flags_parse() {
        let args = parse(&["song.mp3", "--slow_factor", "0.9", "--target_bpm", "70"]);
        assert_eq!(args.input_song, PathBuf::from("song.mp3"));
        assert_eq!(args.slow_factor, Some(0.9));
        assert_eq!(args.target_bpm, Some(70));
        assert!(!args.instrumental);
    }

    #[test]
    fn test_negative_slow_factor_accepted_by_parser() {
        let args = parse(&["song.mp3", "--slow_factor", "-0.5"]);
        assert_eq!(args.slow_factor, Some(-0.5));
    }

    #[test]
    fn test_input_required() {
        assert!(Args::try_parse_from(["lofi"]).is_err());
    }

    #[test]
    fn test_config_fills_unset_flags() {
        let config = Config {
            target_bpm: 72,
            ..Config::default()
        };
        let run = parse(&["song.mp3"]).pipeline_config(&config);
        assert_eq!(run.target_bpm, 72);
        assert_eq!(run.slow_factor, None);

        let run = parse(&["song.mp3", "--target_bpm", "90"]).pipeline_config(&config);
        assert_eq!(run.target_bpm, 90);
    }

    #[test]
    fn test_separator_overrides() {
        let config = Config::default();
        let separator = parse(&["song.mp3", "--output_dir", "stems"]).separator(&config);
        assert_eq!(separator.output_dir(), Path::new("stems"));
        assert_eq!(separator.model(), "spleeter:2stems");

        let separator = parse(&["song.mp3"]).separator(&config);
        assert_eq!(separator.output_dir(), Path::new("output"));
    }
}
