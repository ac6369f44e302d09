//! BER/FER scoring of decoded trials against ground truth.

pub mod metrics;
pub mod report;

pub use metrics::{ErrorRates, compare_bits, format_sci, mean};
pub use report::{EvaluationReport, Evaluator, TrialScore};
