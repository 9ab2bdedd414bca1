//! NIDS Pipeline CLI Module
//!
//! Command-line interface for bootstrapping storage, training, prediction and
//! model inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::bootstrap::ensure_directories;
use crate::config::PipelineConfig;
use crate::export::ArtifactStore;
use crate::inference::{InferenceEngine, PredictionSummary};
use crate::pipeline::{is_allowed_file, predictions_file_name, resolve_data_file, train_model_from_csv_with};
use crate::training::{ModelType, TrainingMetrics};
use crate::utils::{write_predictions_csv, DataLoader};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn alert(s: &str) -> ColoredString  { s.truecolor(240, 110, 100) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "nids")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Network intrusion detection: train on labeled flows, predict new batches")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file (defaults and NIDS_* variables otherwise)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base directory holding uploads/, models/ and data/
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// CSV field separator (a single ASCII character)
    #[arg(long, global = true)]
    pub delimiter: Option<char>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the uploads, models and data directories
    Init,

    /// Train a model and store it as the current artifact
    Train {
        /// Training CSV: a path, or a file name inside the data directory
        #[arg(short, long)]
        data: PathBuf,

        /// Label column name
        #[arg(short, long)]
        label: Option<String>,

        /// Model type (decision_tree, random_forest, naive_bayes)
        #[arg(short, long)]
        model: Option<String>,

        /// Number of trees for random_forest
        #[arg(long)]
        n_estimators: Option<usize>,

        /// Seed for the split and the model
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict a CSV batch with the current artifact
    Predict {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV (defaults to a timestamped file in the uploads directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the summary only
        #[arg(long)]
        no_save: bool,
    },

    /// Show the current artifact
    Info,
}

/// Resolve configuration from the global flags
pub fn load_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::from_env()?,
    };
    if let Some(base) = &cli.base_dir {
        config = config.with_base_dir(base);
    }
    if let Some(delimiter) = cli.delimiter {
        config = config.with_delimiter(delimiter_byte(delimiter)?);
    }
    Ok(config)
}

fn delimiter_byte(delimiter: char) -> anyhow::Result<u8> {
    match u8::try_from(delimiter) {
        Ok(byte) if byte.is_ascii() && byte != b'"' && byte != b'\n' && byte != b'\r' => Ok(byte),
        _ => anyhow::bail!("Unsupported delimiter {:?}: use a single ASCII character", delimiter),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_init(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Init");
    ensure_directories(config.directories())?;
    for dir in config.directories() {
        step_ok(&dir.display().to_string());
    }
    println!();
    Ok(())
}

pub fn cmd_train(
    config: &PipelineConfig,
    data: &Path,
    label: Option<&str>,
    model: Option<&str>,
    n_estimators: Option<usize>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = config.clone();
    if let Some(label) = label {
        config.training.label_column = label.to_string();
    }
    if let Some(model) = model {
        config.training.model_type = model.parse::<ModelType>()?;
    }
    if let Some(n) = n_estimators {
        config.training.n_estimators = n;
    }
    if let Some(seed) = seed {
        config.training.random_seed = seed;
    }

    ensure_directories(config.directories())?;
    let csv_path = if data.is_file() {
        data.to_path_buf()
    } else {
        resolve_data_file(&config.data_dir, &data.to_string_lossy())?
    };

    step_run(&format!(
        "Training {} on {}",
        config.training.model_type.to_string().cyan(),
        csv_path.display()
    ));
    let start = Instant::now();
    let store = ArtifactStore::new(&config.models_dir);
    let metrics = match train_model_from_csv_with(&csv_path, &config) {
        Ok(metrics) => metrics,
        Err(e) => {
            println!("{}", alert("failed"));
            if e.is_training_failure() && store.exists() {
                println!("  {}", dim("Previous model left in place"));
            }
            return Err(e.into());
        }
    };
    step_done(&format!("{:.2?}", start.elapsed()));

    print_metrics(&metrics);
    kv("Artifact", &store.path().display().to_string());
    println!();
    println!("  {}", metrics.summary_line().white().bold());
    println!();

    Ok(())
}

pub fn cmd_predict(
    config: &PipelineConfig,
    data: &Path,
    output: Option<&Path>,
    no_save: bool,
) -> anyhow::Result<()> {
    section("Predict");

    if !is_allowed_file(&data.to_string_lossy()) {
        anyhow::bail!("Unsupported file type: {} (expected .csv)", data.display());
    }

    let artifact = ArtifactStore::new(&config.models_dir).load()?;
    let engine = InferenceEngine::new(artifact.as_ref(), config.inference.clone())?;

    step_run("Loading data");
    let df = DataLoader::new().with_delimiter(config.delimiter).load_csv(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Scoring");
    let start = Instant::now();
    let (results, summary) = engine.predict(&df)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_summary(&summary);

    if !no_save {
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => config
                .upload_dir
                .join(predictions_file_name(chrono::Local::now().naive_local())),
        };
        write_predictions_csv(&df, &results, &path)?;
        step_ok(&format!("Saved → {}", path.display()));
    }
    println!();

    Ok(())
}

pub fn cmd_info(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Model");

    let store = ArtifactStore::new(&config.models_dir);
    let info = match store.info()? {
        Some(info) => info,
        None => {
            println!("  {}", "No trained model. Run `nids train` first.".yellow());
            println!();
            return Ok(());
        }
    };

    kv("Path", &info.path.display().to_string());
    kv("Updated", &info.modified.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    kv("Size", &format!("{} bytes", info.size_bytes));

    match store.load() {
        Ok(Some(artifact)) => {
            kv("Model", &artifact.model_type().to_string());
            kv("Version", &artifact.version.to_string());
            kv("Trained", &artifact.trained_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
            kv("Label column", &artifact.label_column);
            kv("Classes", &artifact.labels.classes().join(", "));
            kv("Features", &artifact.feature_names().join(", "));
            print_metrics(&artifact.metrics);
        }
        Ok(None) => {}
        Err(e) => println!("  {} {}", alert("unreadable:"), e),
    }
    println!();

    Ok(())
}

fn print_metrics(metrics: &TrainingMetrics) {
    println!();
    kv("Accuracy", &format!("{:.4}", metrics.accuracy));
    kv("Precision", &format!("{:.4}", metrics.precision));
    kv("Recall", &format!("{:.4}", metrics.recall));
    kv("F1", &format!("{:.4}", metrics.f1_score));
    if let Some(positive) = &metrics.positive_class {
        kv("Positive class", positive);
    }
    kv("Rows", &format!("{} train / {} holdout", metrics.n_train, metrics.n_holdout));
    if !metrics.skipped_classes.is_empty() {
        kv("Not evaluated", &metrics.skipped_classes.join(", "));
    }
}

fn print_summary(summary: &PredictionSummary) {
    println!();
    kv("Rows", &summary.num_rows.to_string());
    for (class, count) in &summary.class_counts {
        kv(class, &count.to_string());
    }
    if let (Some(count), Some(rate)) = (summary.anomaly_count, summary.anomaly_rate) {
        let text = format!("{} ({:.1}%)", count, rate * 100.0);
        let styled = if count > 0 { alert(&text) } else { ok(&text) };
        println!("  {:<18} {}", muted("Anomalies"), styled);
    }
    if summary.unknown_categories > 0 {
        kv("Unseen categories", &summary.unknown_categories.to_string());
    }
}
