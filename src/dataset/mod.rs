//! Dataset layout: trial directories, their artifacts, and the decode pass.

pub mod ground_truth;
pub mod npy;
pub mod trial;
pub mod walker;

pub use ground_truth::{
    BinaryListScan, GroundTruth, GroundTruthResolver, GroundTruthSource, GroundTruthStrategy,
    KnownFiles, KnownKeys,
};
pub use trial::{Trial, discover_trials, relative_label};
pub use walker::{DatasetWalker, DecodeSummary, TrialOutcome, decode_and_persist};
