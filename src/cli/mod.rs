//! Command-line interface for running the training pipeline and inspecting data.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

use crate::optimizer::SamplerType;
use crate::pipeline::{PipelineConfig, PipelineOutcome, TrainingPipeline};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString    { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: impl std::fmt::Display) {
    println!("  {:<16} {}", muted(key), val.to_string().white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "insurance-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train, evaluate and register an insurance charges regression model")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline
    Run {
        /// Input CSV file (overrides the config file)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fraction of rows held out for evaluation
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Seed of the train/test shuffle
        #[arg(long)]
        split_seed: Option<u64>,

        /// Number of search trials
        #[arg(short, long)]
        trials: Option<usize>,

        /// Largest accepted held-out RMSE
        #[arg(long)]
        rmse_threshold: Option<f64>,

        /// Cross-validation folds per trial
        #[arg(long)]
        cv_folds: Option<usize>,

        /// Search sampler (tpe, random)
        #[arg(long)]
        sampler: Option<SamplerType>,

        /// Write the registered model record here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the full run report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show data information
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Flag values that override the configuration file
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub data: Option<PathBuf>,
    pub test_fraction: Option<f64>,
    pub split_seed: Option<u64>,
    pub trials: Option<usize>,
    pub rmse_threshold: Option<f64>,
    pub cv_folds: Option<usize>,
    pub sampler: Option<SamplerType>,
}

impl RunOverrides {
    pub fn apply(self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(data) = self.data {
            config.file_path = data;
        }
        if let Some(v) = self.test_fraction {
            config.test_fraction = v;
        }
        if let Some(v) = self.split_seed {
            config.split_seed = v;
        }
        if let Some(v) = self.trials {
            config.trial_budget = v;
        }
        if let Some(v) = self.rmse_threshold {
            config.rmse_threshold = v;
        }
        if let Some(v) = self.cv_folds {
            config.cv_folds = v;
        }
        if let Some(v) = self.sampler {
            config.sampler = v;
        }
        config
    }
}

/// Config file (or defaults) with flag overrides applied
pub fn resolve_config(config_path: Option<&Path>, overrides: RunOverrides) -> anyhow::Result<PipelineConfig> {
    let base = match config_path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    Ok(overrides.apply(base))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(
    config: PipelineConfig,
    output: Option<&Path>,
    report: Option<&Path>,
) -> anyhow::Result<PipelineOutcome> {
    section("Run");
    kv("Data", config.file_path.display());
    kv("Trials", config.trial_budget);
    kv("Sampler", config.sampler);
    kv("Threshold", format!("{:.2}", config.rmse_threshold));

    let pipeline = TrainingPipeline::new(config);
    kv("Run id", pipeline.run_id());

    let outcome = pipeline.run()?;
    print_outcome(&outcome);

    if let Some(path) = output {
        outcome.registered.save(path)?;
        println!("  {} model record → {}", ok("✓"), path.display());
    }
    if let Some(path) = report {
        outcome.save(path)?;
        println!("  {} run report → {}", ok("✓"), path.display());
    }
    println!();
    Ok(outcome)
}

fn print_outcome(outcome: &PipelineOutcome) {
    section("Stages");
    for timing in &outcome.timings {
        println!(
            "  {} {:<12} {}",
            ok("✓"),
            timing.stage.name(),
            dim(&format!("{:.3}s", timing.elapsed_secs))
        );
    }

    section("Selection");
    kv("Model", &outcome.selection.configuration);
    kv("CV RMSE", format!("{:.2}", outcome.selection.cv_rmse()));
    kv("Trials", outcome.selection.n_trials());
    kv("Features", outcome.feature_names.len());

    section("Held-out metrics");
    for (name, value) in outcome.metrics.iter() {
        kv(name, format!("{:.4}", value));
    }

    section("Registered");
    kv("Fingerprint", &outcome.registered.fingerprint[..12.min(outcome.registered.fingerprint.len())]);
    kv("At", outcome.registered.registered_at.to_rfc3339());
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let dataset = DataLoader::new().load(data_path)?;
    let df = dataset.frame();

    kv("File", data_path.display());
    kv("Rows", dataset.n_rows());
    kv("Columns", dataset.n_cols());
    println!();

    println!("  {:<20} {:<12} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(40)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6}",
            col.name().as_str(),
            format!("{}", col.dtype()).truecolor(140, 140, 140),
            col.null_count()
        );
    }

    section("Preview");
    println!("{}", dataset.preview());
    Ok(())
}
