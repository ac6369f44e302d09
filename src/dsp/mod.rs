//! Receiver signal processing: Doppler correction, matched filtering with
//! symbol timing recovery, and hard bit decisions.

pub mod decision;
pub mod doppler;
pub mod matched_filter;

pub use decision::hard_decision;
pub use doppler::{compensate_doppler, estimate_doppler};
pub use matched_filter::SymbolSynchronizer;
