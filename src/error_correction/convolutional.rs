use tracing::warn;

// TODO: real Viterbi decoding needs the encoder's generator polynomials and
// constraint length, which trial metadata does not carry yet.

/// Convolutional (Viterbi) decoding stage.
///
/// Not implemented: no trellis decoding is performed and the hard bits are
/// returned exactly as received. Trials tagged `convolutional` are therefore
/// scored on their raw channel bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvolutionalDecoder;

impl ConvolutionalDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, bits: Vec<u8>) -> Vec<u8> {
        warn!(
            "Convolutional decoding not implemented; passing {} bits through",
            bits.len()
        );
        bits
    }
}
