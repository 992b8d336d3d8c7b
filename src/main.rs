mod analyser;
mod errors;
mod ml;
mod ui;

use analyser::containers::{AnalysisReport, FeatureRecord};
use analyser::network;
use chrono::Utc;
use clap::{Parser, Subcommand};
use errors::Error;
use ml::dataset;
use ml::predictor::{self, Predictor};
use ml::storage::{DatasetKind, ModelStore};
use ml::trainer::Trainer;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use ui::output;

/// Malsniff classifies captured network traffic as malicious or benign
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding datasets and trained models
    #[arg(short, long, default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract per-packet feature records from a capture
    Analyse {
        /// pcap/pcapng file to analyze
        #[arg(short = 'f', long)]
        file: String,

        /// Display output as formatted JSON
        #[arg(short, long)]
        json: bool,

        /// Directory to save the report to
        #[arg(short, long)]
        output_dir: Option<String>,
    },

    /// Assemble a labelled training dataset from capture directories
    BuildDataset {
        /// Directory of captures recorded during malicious activity
        #[arg(long)]
        malicious_dir: PathBuf,

        /// Directory of captures recorded during normal activity
        #[arg(long)]
        benign_dir: PathBuf,
    },

    /// Fit the classifier on the stored dataset
    Train,

    /// Score a capture with the trained model
    Predict {
        /// pcap/pcapng file to analyze
        #[arg(short = 'f', long)]
        file: String,

        /// Display output as formatted JSON
        #[arg(short, long)]
        json: bool,

        /// Directory to save the report to
        #[arg(short, long)]
        output_dir: Option<String>,
    },
}

fn main() -> ExitCode {
    simple_logger::init_with_env().unwrap();

    let args = Args::parse();
    let store = ModelStore::new(&args.data_dir);

    let result = match args.command {
        Command::Analyse {
            file,
            json,
            output_dir,
        } => run_analyse(&file, json, output_dir.as_deref()),
        Command::BuildDataset {
            malicious_dir,
            benign_dir,
        } => run_build_dataset(&store, &malicious_dir, &benign_dir),
        Command::Train => run_train(&store),
        Command::Predict {
            file,
            json,
            output_dir,
        } => run_predict(&store, &file, json, output_dir.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("Processing failed. See log output for details.");
            ExitCode::FAILURE
        }
    }
}

fn run_analyse(file: &str, json: bool, output_dir: Option<&str>) -> Result<(), Error> {
    let records = network::analyse(file)?;

    let report = AnalysisReport {
        capture: file.to_string(),
        created_at: Utc::now(),
        records,
        predictions: None,
        prediction_score: None,
    };

    emit_report(&report, json, output_dir, "analysis.json")
}

/// Analyses every capture under the malicious and benign directories and
/// assembles the labelled dataset: malicious rows first (fresh write), then
/// benign rows appended.
fn run_build_dataset(
    store: &ModelStore,
    malicious_dir: &Path,
    benign_dir: &Path,
) -> Result<(), Error> {
    let destination = store.dataset_path(DatasetKind::Network);
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let malicious = analyse_directory(malicious_dir);
    if malicious.is_empty() {
        return Err(Error::DatasetMalformed {
            path: destination.display().to_string(),
            reason: format!(
                "no captures in {} could be analysed",
                malicious_dir.display()
            ),
        });
    }
    dataset::dump_records(&malicious, &destination, 1, false)?;

    let benign = analyse_directory(benign_dir);
    dataset::dump_records(&benign, &destination, 0, true)?;

    log::info!(
        "Dataset written to {}: {} malicious and {} benign rows",
        destination.display(),
        malicious.len(),
        benign.len()
    );

    Ok(())
}

/// Feature records from every readable capture in a directory.
///
/// One bad capture must not abort the batch: unreadable entries are logged
/// and skipped.
fn analyse_directory(dir: &Path) -> Vec<FeatureRecord> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::error!("Cannot list capture directory {}: {err}", dir.display());
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(err) => {
                log::warn!("Skipping unreadable directory entry: {err}");
                continue;
            }
        };

        match network::analyse(path.to_string_lossy().as_ref()) {
            Ok(mut found) => records.append(&mut found),
            Err(err) => log::warn!("Skipping capture {}: {err}", path.display()),
        }
    }

    records
}

fn run_train(store: &ModelStore) -> Result<(), Error> {
    let trainer = Trainer::new(store, dataset::LABEL_COLUMN);
    let summary = trainer.train(DatasetKind::Network)?;

    println!(
        "Trained on {} of {} rows across {} features.",
        summary.trained_rows, summary.rows, summary.features
    );

    Ok(())
}

fn run_predict(
    store: &ModelStore,
    file: &str,
    json: bool,
    output_dir: Option<&str>,
) -> Result<(), Error> {
    let records = network::analyse(file)?;
    let predictor = Predictor::new(store, DatasetKind::Network, dataset::LABEL_COLUMN)?;

    let predictions = predictor.predict(&records);
    let score = predictor::prediction_score(&predictions);

    let report = AnalysisReport {
        capture: file.to_string(),
        created_at: Utc::now(),
        records,
        predictions: Some(predictions),
        prediction_score: Some(score),
    };

    emit_report(&report, json, output_dir, "prediction.json")
}

fn emit_report(
    report: &AnalysisReport,
    json: bool,
    output_dir: Option<&str>,
    filename: &str,
) -> Result<(), Error> {
    if json {
        let rendered = output::report_as_json(report)?;
        match output_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                output::save_report(&rendered, &Path::new(dir).join(filename))?;
            }
            None => println!("{rendered}"),
        }
    } else {
        output::print_report(report);
        if let Some(dir) = output_dir {
            fs::create_dir_all(dir)?;
            let rendered = output::report_as_json(report)?;
            output::save_report(&rendered, &Path::new(dir).join(filename))?;
        }
    }

    Ok(())
}
