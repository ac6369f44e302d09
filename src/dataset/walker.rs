use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::dataset::trial::{Trial, discover_trials};
use crate::error::Result;
use crate::receiver::Receiver;
use crate::ui::progress::{Pass, ProgressManager};

/// What happened to one trial during a decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    Decoded,
    /// Already decoded, or nothing to decode
    Skipped,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodeSummary {
    pub decoded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DecodeSummary {
    fn record(&mut self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::Decoded => self.decoded += 1,
            TrialOutcome::Skipped => self.skipped += 1,
            TrialOutcome::Failed => self.failed += 1,
        }
    }
}

/// Run the receiver chain on `trial` and persist the result.
pub fn decode_and_persist(receiver: &Receiver, trial: &Trial) -> Result<Vec<u8>> {
    let config = trial.config()?;
    let rx = trial.load_rx()?;
    let bits = receiver.decode(rx, &config);
    let path = trial.decoded_path();
    trial.save_decoded(&bits)?;
    info!("Decoded and saved: {}", path.display());
    Ok(bits)
}

/// Decodes every trial under a dataset root that has raw samples but no
/// decoded-bits artifact yet.
pub struct DatasetWalker {
    receiver: Receiver,
    jobs: usize,
    progress: Option<ProgressManager>,
}

impl DatasetWalker {
    pub fn new(receiver: Receiver) -> Self {
        Self {
            receiver,
            jobs: 1,
            progress: None,
        }
    }

    /// Number of worker threads (at least one)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Process one trial directory. Existing artifacts are reused, never
    /// recomputed.
    pub fn process_trial(&self, dir: &Path) -> Result<TrialOutcome> {
        let trial = Trial::load(dir)?;
        if trial.has_decoded() {
            debug!("Already decoded, skipping: {}", dir.display());
            return Ok(TrialOutcome::Skipped);
        }
        if !trial.has_rx() {
            debug!("No raw samples, skipping: {}", dir.display());
            return Ok(TrialOutcome::Skipped);
        }
        decode_and_persist(&self.receiver, &trial)?;
        Ok(TrialOutcome::Decoded)
    }

    fn process_logged(&self, dir: &Path) -> TrialOutcome {
        let outcome = self.process_trial(dir).unwrap_or_else(|e| {
            warn!("Trial {} failed: {}", dir.display(), e);
            TrialOutcome::Failed
        });
        if let Some(progress) = &self.progress {
            progress.advance(Pass::Decode);
        }
        outcome
    }

    /// Decode every trial under `root`. Per-trial failures are logged and
    /// counted; only an unreadable root is an error.
    pub fn run(&self, root: &Path) -> Result<DecodeSummary> {
        let dirs = discover_trials(root)?;
        info!(
            "Found {} trials under {} ({} worker{})",
            dirs.len(),
            root.display(),
            self.jobs,
            if self.jobs == 1 { "" } else { "s" }
        );

        if let Some(progress) = &self.progress {
            progress.start(Pass::Decode, dirs.len() as u64, &root.display().to_string());
        }

        let summary = if self.jobs > 1 && dirs.len() > 1 {
            self.run_parallel(dirs)
        } else {
            let mut summary = DecodeSummary::default();
            for dir in &dirs {
                summary.record(self.process_logged(dir));
            }
            summary
        };

        if let Some(progress) = &self.progress {
            progress.finish(Pass::Decode);
        }
        info!(
            "All trials processed: {} decoded, {} skipped, {} failed",
            summary.decoded, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Trials share nothing but the filesystem, so workers just drain a
    /// queue of directories.
    fn run_parallel(&self, dirs: Vec<PathBuf>) -> DecodeSummary {
        let (work_tx, work_rx) = crossbeam_channel::unbounded::<PathBuf>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<TrialOutcome>();
        for dir in dirs {
            let _ = work_tx.send(dir);
        }
        drop(work_tx);

        let mut summary = DecodeSummary::default();
        std::thread::scope(|scope| {
            for _ in 0..self.jobs {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for dir in work_rx.iter() {
                        if done_tx.send(self.process_logged(&dir)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);

            for outcome in done_rx.iter() {
                summary.record(outcome);
            }
        });
        summary
    }
}
