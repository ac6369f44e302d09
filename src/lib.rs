pub mod config;
pub mod dataset;
pub mod dsp;
pub mod error;
pub mod error_correction;
pub mod evaluation;
pub mod receiver;
pub mod ui;
pub mod utils;

pub use config::{ReceiverConfig, TrialConfig};
pub use error::{ReceiverError, Result};
pub use receiver::Receiver;
