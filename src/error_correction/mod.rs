//! Forward error correction stage applied after bit decisions.

pub mod bits;
pub mod convolutional;
pub mod reed_solomon;
pub mod scheme;

pub use convolutional::ConvolutionalDecoder;
pub use reed_solomon::{BlockCorrector, ReedSolomonDecoder, ReedSolomonStage};
pub use scheme::{CodingScheme, FecStage};
