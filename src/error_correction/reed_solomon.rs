use reed_solomon::Decoder;
use tracing::{debug, warn};

use crate::error::{ReceiverError, Result};
use crate::error_correction::bits::{pack_bits, unpack_bits};
use crate::utils::consts::RS_BLOCK_LEN;

/// Byte-level block corrector the Reed-Solomon stage delegates to.
///
/// Takes received codewords (data followed by parity) and returns the
/// corrected data bytes with parity stripped.
pub trait BlockCorrector: Send + Sync {
    fn correct(&self, received: &[u8]) -> Result<Vec<u8>>;
}

/// Result of error correction operation
#[derive(Debug)]
pub struct ErrorCorrectionResult {
    /// The corrected data, parity removed
    pub data: Vec<u8>,
    /// Number of data bytes that were changed by correction
    pub errors_corrected: usize,
}

/// Reed-Solomon decoder over GF(256).
///
/// Input longer than one codeword is split into blocks of
/// [`RS_BLOCK_LEN`] bytes; a shorter final block is decoded as a shortened
/// code. Every block carries `ecc_len` parity bytes.
pub struct ReedSolomonDecoder {
    decoder: Decoder,
    ecc_len: usize,
}

impl ReedSolomonDecoder {
    /// Create a decoder with `ecc_len` parity symbols per block
    pub fn new(ecc_len: usize) -> Self {
        let decoder = Decoder::new(ecc_len);
        Self { decoder, ecc_len }
    }

    /// Get the error correction code length
    pub fn ecc_len(&self) -> usize {
        self.ecc_len
    }

    /// Decode and correct every block of `encoded_data`.
    ///
    /// Fails if any block is too short to hold parity plus data, or has more
    /// errors than the code can correct.
    pub fn decode(&self, encoded_data: &[u8]) -> Result<ErrorCorrectionResult> {
        if self.ecc_len == 0 || self.ecc_len >= RS_BLOCK_LEN {
            return Err(ReceiverError::Fec(format!(
                "unsupported parity length {}",
                self.ecc_len
            )));
        }

        let mut data = Vec::with_capacity(encoded_data.len());
        let mut errors_corrected = 0;

        for (index, block) in encoded_data.chunks(RS_BLOCK_LEN).enumerate() {
            if block.len() <= self.ecc_len {
                return Err(ReceiverError::Fec(format!(
                    "block {} has {} bytes, need more than {} parity bytes",
                    index,
                    block.len(),
                    self.ecc_len
                )));
            }

            let data_len = block.len() - self.ecc_len;
            let mut corrupted = block.to_vec();
            let corrected = self
                .decoder
                .correct(&mut corrupted, None)
                .map_err(|e| {
                    ReceiverError::Fec(format!("block {}: {:?}", index, e))
                })?;

            let recovered = corrected.data();
            errors_corrected += recovered
                .iter()
                .zip(&block[..data_len])
                .filter(|(a, b)| a != b)
                .count();
            data.extend_from_slice(recovered);
        }

        debug!(
            "RS decoded {} bytes -> {} bytes ({} byte errors corrected)",
            encoded_data.len(),
            data.len(),
            errors_corrected
        );

        Ok(ErrorCorrectionResult {
            data,
            errors_corrected,
        })
    }
}

impl BlockCorrector for ReedSolomonDecoder {
    fn correct(&self, received: &[u8]) -> Result<Vec<u8>> {
        self.decode(received).map(|result| result.data)
    }
}

/// Bit-level Reed-Solomon stage.
///
/// Packs hard bits into bytes, corrects them, and unpacks the data bytes.
/// If no codec is configured or correction fails, the input bits are
/// returned unchanged and the condition is logged.
pub struct ReedSolomonStage {
    codec: Option<Box<dyn BlockCorrector>>,
}

impl ReedSolomonStage {
    pub fn new(ecc_len: usize) -> Self {
        Self::with_codec(Box::new(ReedSolomonDecoder::new(ecc_len)))
    }

    pub fn with_codec(codec: Box<dyn BlockCorrector>) -> Self {
        Self { codec: Some(codec) }
    }

    /// Stage with no codec backing it; always passes bits through.
    pub fn unavailable() -> Self {
        Self { codec: None }
    }

    pub fn is_available(&self) -> bool {
        self.codec.is_some()
    }

    pub fn decode(&self, bits: Vec<u8>) -> Vec<u8> {
        let Some(codec) = &self.codec else {
            warn!("Reed-Solomon codec unavailable; passing {} bits through", bits.len());
            return bits;
        };

        let n_bytes = bits.len() / 8;
        if n_bytes == 0 {
            return bits;
        }

        let bytes_in = pack_bits(&bits[..n_bytes * 8]);
        match codec.correct(&bytes_in) {
            Ok(decoded) => unpack_bits(&decoded),
            Err(e) => {
                warn!("RS decode error: {}", e);
                bits
            }
        }
    }
}
