/// Log level (overridden by RUST_LOG)
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Per-trial defaults (used when meta.json omits the key)
// ============================================================================

/// Samples per BPSK symbol
pub const DEFAULT_SAMPLES_PER_SYMBOL: usize = 8;

/// Sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE: f64 = 10_000.0;

/// Impairment tag that enables Doppler compensation (case-insensitive)
pub const DOPPLER_IMPAIRMENT: &str = "doppler";

// ============================================================================
// Receiver parameters
// ============================================================================

/// Reed-Solomon parity symbols per block
pub const RS_PARITY_SYMBOLS: usize = 4;

/// Reed-Solomon codeword length over GF(256), parity included
pub const RS_BLOCK_LEN: usize = 255;

/// Symbol periods examined by the timing-phase energy search
pub const TIMING_WINDOW_SYMBOLS: usize = 10;

// ============================================================================
// Trial directory layout
// ============================================================================

pub const RX_FILE: &str = "rx.npy";
pub const META_FILE: &str = "meta.json";
pub const DECODED_FILE: &str = "decoded_bits.npy";

/// Preferred dataset directory when no root is given
pub const DEFAULT_DATASET_DIR: &str = "cubesat_dataset";

/// Ground-truth files, tried in order
pub const GROUND_TRUTH_FILES: [&str; 7] = [
    "tx_bits.npy",
    "gt_bits.npy",
    "truth_bits.npy",
    "labels.npy",
    "bits.npy",
    "ref_bits.npy",
    "ground_truth.npy",
];

/// Metadata keys holding inline ground truth, tried in order
pub const GROUND_TRUTH_KEYS: [&str; 7] = [
    "ground_truth_bits",
    "ground_truth",
    "tx_bits",
    "gt_bits",
    "bits",
    "truth_bits",
    "labels",
];

/// Nested fields looked up when a ground-truth key holds an object
pub const GROUND_TRUTH_INNER_KEYS: [&str; 3] = ["bits", "data", "values"];
