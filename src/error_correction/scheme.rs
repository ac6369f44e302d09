use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error_correction::{ConvolutionalDecoder, ReedSolomonStage};

/// Channel coding applied by the transmitter of a trial.
///
/// Read from the `scheme` key of `meta.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodingScheme {
    #[default]
    None,
    #[serde(alias = "rs")]
    ReedSolomon,
    #[serde(alias = "viterbi")]
    Convolutional,
}

impl CodingScheme {
    /// Legacy datasets encode the scheme in the directory name
    /// (`.../reed_solomon/...`, `.../convolutional/...`). Used only when
    /// metadata has no explicit `scheme`.
    pub fn infer_from_path(path: &Path) -> Self {
        let lowered = path.to_string_lossy().to_lowercase();
        if lowered.contains("reed_solomon") {
            Self::ReedSolomon
        } else if lowered.contains("convolutional") {
            Self::Convolutional
        } else {
            Self::None
        }
    }
}

/// FEC decoder for one trial, selected by its [`CodingScheme`].
pub enum FecStage {
    Uncoded,
    ReedSolomon(ReedSolomonStage),
    Convolutional(ConvolutionalDecoder),
}

impl FecStage {
    pub fn for_scheme(scheme: CodingScheme, rs_parity: usize) -> Self {
        match scheme {
            CodingScheme::None => Self::Uncoded,
            CodingScheme::ReedSolomon => {
                Self::ReedSolomon(ReedSolomonStage::new(rs_parity))
            }
            CodingScheme::Convolutional => {
                Self::Convolutional(ConvolutionalDecoder::new())
            }
        }
    }

    pub fn decode(&self, bits: Vec<u8>) -> Vec<u8> {
        match self {
            Self::Uncoded => bits,
            Self::ReedSolomon(stage) => stage.decode(bits),
            Self::Convolutional(decoder) => decoder.decode(bits),
        }
    }
}
