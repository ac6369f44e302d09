use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::dataset::{
    GroundTruthResolver, GroundTruthSource, Trial, decode_and_persist,
    discover_trials, relative_label,
};
use crate::error::{ReceiverError, Result};
use crate::evaluation::metrics::{ErrorRates, compare_bits, format_sci, mean};
use crate::receiver::Receiver;
use crate::ui::progress::{Pass, ProgressManager};

/// Score of one evaluated trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialScore {
    /// Trial path relative to the dataset root, `/`-separated
    pub trial: String,
    #[serde(flatten)]
    pub rates: ErrorRates,
    pub ground_truth: GroundTruthSource,
}

/// Dataset-wide evaluation result.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Prefix for trial labels in the console report
    pub dataset: String,
    pub trials: Vec<TrialScore>,
    pub mean_ber: Option<f64>,
    pub mean_fer: Option<f64>,
}

impl EvaluationReport {
    pub fn new(dataset: impl Into<String>, trials: Vec<TrialScore>) -> Self {
        let bers: Vec<f64> = trials.iter().map(|t| t.rates.ber).collect();
        let fers: Vec<f64> = trials.iter().map(|t| f64::from(t.rates.fer)).collect();
        Self {
            dataset: dataset.into(),
            mean_ber: mean(&bers),
            mean_fer: mean(&fers),
            trials,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    fn label(&self, trial: &str) -> String {
        if self.dataset.is_empty() {
            trial.to_string()
        } else {
            format!("{}/{}", self.dataset, trial)
        }
    }

    /// Console report: one line per trial, then the dataset means.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for score in &self.trials {
            let _ = writeln!(
                out,
                "{}: BER={} FER={}",
                self.label(&score.trial),
                format_sci(score.rates.ber),
                score.rates.fer
            );
        }
        match (self.mean_ber, self.mean_fer) {
            (Some(ber), Some(fer)) => {
                let _ = writeln!(out, "\nOverall mean BER: {}", format_sci(ber));
                let _ = writeln!(out, "Overall mean FER: {}", format_sci(fer));
            }
            _ => {
                let _ = writeln!(out, "No valid results found to evaluate.");
            }
        }
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| ReceiverError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|e| {
            ReceiverError::Json {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }
}

/// Scores decoded bits against discovered ground truth.
pub struct Evaluator {
    receiver: Receiver,
    resolver: GroundTruthResolver,
    progress: Option<ProgressManager>,
}

impl Evaluator {
    pub fn new(receiver: Receiver) -> Self {
        Self {
            receiver,
            resolver: GroundTruthResolver::default(),
            progress: None,
        }
    }

    pub fn with_resolver(mut self, resolver: GroundTruthResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_progress(mut self, progress: ProgressManager) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Evaluate the trial at `dir`.
    ///
    /// `Ok(None)` means the trial does not qualify: no decoded bits and no
    /// raw samples to produce them, or no ground truth. Missing decoded bits
    /// are produced on demand and persisted.
    pub fn evaluate_trial(&self, dir: &Path) -> Result<Option<(ErrorRates, GroundTruthSource)>> {
        let trial = Trial::load(dir)?;

        let decoded = if trial.has_decoded() {
            trial.load_decoded()?
        } else if trial.has_rx() {
            decode_and_persist(&self.receiver, &trial)?
        } else {
            debug!("Nothing to evaluate in {}", dir.display());
            return Ok(None);
        };

        let Some(truth) = self.resolver.resolve(dir, trial.metadata()) else {
            return Ok(None);
        };

        Ok(Some((compare_bits(&decoded, &truth.bits), truth.source)))
    }

    /// Evaluate every trial under `root`. Trials that fail or do not qualify
    /// are left out of the means.
    pub fn evaluate_dataset(&self, root: &Path, dataset_label: &str) -> Result<EvaluationReport> {
        let dirs = discover_trials(root)?;

        if let Some(progress) = &self.progress {
            progress.start(Pass::Evaluate, dirs.len() as u64, dataset_label);
        }

        let mut scores = Vec::new();
        for dir in &dirs {
            match self.evaluate_trial(dir) {
                Ok(Some((rates, ground_truth))) => scores.push(TrialScore {
                    trial: relative_label(root, dir),
                    rates,
                    ground_truth,
                }),
                Ok(None) => debug!("Excluded from evaluation: {}", dir.display()),
                Err(e) => warn!("Trial {} not evaluated: {}", dir.display(), e),
            }
            if let Some(progress) = &self.progress {
                progress.advance(Pass::Evaluate);
            }
        }

        if let Some(progress) = &self.progress {
            progress.finish(Pass::Evaluate);
        }
        info!("Evaluated {} of {} trials", scores.len(), dirs.len());
        Ok(EvaluationReport::new(dataset_label, scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(trial: &str, ber: f64, fer: u8) -> TrialScore {
        TrialScore {
            trial: trial.to_string(),
            rates: ErrorRates {
                bit_errors: 0,
                compared_bits: 10,
                ber,
                fer,
            },
            ground_truth: GroundTruthSource::File("gt_bits.npy".into()),
        }
    }

    #[test]
    fn test_means_over_trials() {
        let report = EvaluationReport::new(
            "set",
            vec![score("a", 0.1, 1), score("b", 0.0, 0), score("c", 0.2, 1)],
        );
        assert!((report.mean_ber.unwrap() - 0.1).abs() < 1e-12);
        assert!((report.mean_fer.unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_render_lines() {
        let report = EvaluationReport::new("cubesat_dataset", vec![score("doppler/p1", 0.2, 1)]);
        let text = report.render();
        assert!(text.contains("cubesat_dataset/doppler/p1: BER=2.00e-01 FER=1\n"));
        assert!(text.contains("Overall mean BER: 2.00e-01"));
        assert!(text.contains("Overall mean FER: 1.00e+00"));
    }

    #[test]
    fn test_render_empty() {
        let report = EvaluationReport::new("x", Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.render(), "No valid results found to evaluate.\n");
    }

    #[test]
    fn test_json_shape() {
        let report = EvaluationReport::new("", vec![score("t", 0.5, 1)]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["trials"][0]["trial"], "t");
        assert_eq!(value["trials"][0]["fer"], 1);
        assert_eq!(value["trials"][0]["ground_truth"]["kind"], "file");
        assert_eq!(value["mean_ber"], 0.5);
    }
}
