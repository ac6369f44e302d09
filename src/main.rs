use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use doppler_rx::dataset::DatasetWalker;
use doppler_rx::evaluation::Evaluator;
use doppler_rx::ui::print_banner;
use doppler_rx::ui::progress::ProgressManager;
use doppler_rx::utils::consts::*;
use doppler_rx::utils::logging::init_logging;
use doppler_rx::{Receiver, ReceiverConfig};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Batch BPSK receiver and BER/FER evaluator for recorded trials",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ReceiverArgs {
    /// Reed-Solomon parity symbols per block
    #[arg(long, default_value_t = RS_PARITY_SYMBOLS)]
    rs_parity: usize,
    /// Symbol periods searched for the timing phase
    #[arg(long, default_value_t = TIMING_WINDOW_SYMBOLS)]
    timing_window: usize,
}

impl ReceiverArgs {
    fn receiver(&self) -> Receiver {
        Receiver::new(ReceiverConfig {
            rs_parity: self.rs_parity,
            timing_window_symbols: self.timing_window,
        })
    }
}

#[derive(Args, Clone)]
struct ReportArgs {
    /// Prefix for trial labels (defaults to the dataset directory name)
    #[arg(long)]
    label: Option<String>,
    /// Also write the report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every trial that has no decoded bits yet
    Decode {
        root: Option<PathBuf>,
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
        #[command(flatten)]
        receiver: ReceiverArgs,
    },
    /// Score decoded bits against ground truth
    Evaluate {
        root: Option<PathBuf>,
        #[command(flatten)]
        report: ReportArgs,
        #[command(flatten)]
        receiver: ReceiverArgs,
    },
    /// Decode, then evaluate
    Run {
        root: Option<PathBuf>,
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
        #[command(flatten)]
        report: ReportArgs,
        #[command(flatten)]
        receiver: ReceiverArgs,
    },
}

/// Explicit root, else `./cubesat_dataset` if present, else `.`
fn resolve_root(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| {
        let preferred = PathBuf::from(DEFAULT_DATASET_DIR);
        if preferred.is_dir() {
            preferred
        } else {
            PathBuf::from(".")
        }
    })
}

fn dataset_label(root: &Path, label: Option<String>) -> String {
    label.unwrap_or_else(|| {
        root.canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| root.display().to_string())
    })
}

fn decode(
    root: &Path,
    jobs: usize,
    receiver: Receiver,
    progress: &ProgressManager,
) -> anyhow::Result<()> {
    DatasetWalker::new(receiver)
        .with_jobs(jobs)
        .with_progress(progress.clone())
        .run(root)
        .with_context(|| format!("decoding dataset {}", root.display()))?;
    Ok(())
}

fn evaluate(
    root: &Path,
    args: ReportArgs,
    receiver: Receiver,
    progress: &ProgressManager,
) -> anyhow::Result<()> {
    let label = dataset_label(root, args.label);
    let report = Evaluator::new(receiver)
        .with_progress(progress.clone())
        .evaluate_dataset(root, &label)
        .with_context(|| format!("evaluating dataset {}", root.display()))?;

    print!("{}", report.render());

    if let Some(path) = args.report {
        report
            .write_json(&path)
            .with_context(|| format!("writing report {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    print_banner();

    let cli = Cli::parse();
    let progress = ProgressManager::new();

    match cli.command {
        Commands::Decode { root, jobs, receiver } => {
            let root = resolve_root(root);
            decode(&root, jobs, receiver.receiver(), &progress)?;
        }
        Commands::Evaluate { root, report, receiver } => {
            let root = resolve_root(root);
            evaluate(&root, report, receiver.receiver(), &progress)?;
        }
        Commands::Run { root, jobs, report, receiver } => {
            let root = resolve_root(root);
            decode(&root, jobs, receiver.receiver(), &progress)?;
            evaluate(&root, report, receiver.receiver(), &progress)?;
        }
    }

    Ok(())
}
