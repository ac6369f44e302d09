use num_complex::Complex64;
use tracing::debug;

use crate::config::{ReceiverConfig, TrialConfig};
use crate::dsp::{
    SymbolSynchronizer, compensate_doppler, estimate_doppler, hard_decision,
};
use crate::error_correction::FecStage;

/// Batch BPSK receiver.
///
/// Signal chain per trial: optional Doppler estimation and compensation,
/// rectangular matched filter with timing recovery, hard decisions, then
/// the FEC stage picked by the trial's coding scheme.
#[derive(Clone, Debug, Default)]
pub struct Receiver {
    config: ReceiverConfig,
}

impl Receiver {
    pub fn new(config: ReceiverConfig) -> Self {
        Self { config }
    }

    /// Remove the estimated carrier offset when the trial is tagged with a
    /// Doppler impairment; otherwise return `rx` untouched.
    pub fn correct_doppler(
        &self,
        rx: Vec<Complex64>,
        trial: &TrialConfig,
    ) -> Vec<Complex64> {
        if !trial.has_doppler() {
            return rx;
        }
        match estimate_doppler(&rx, trial.sample_rate) {
            Some(doppler_hz) => {
                debug!("Estimated Doppler offset: {:.2} Hz", doppler_hz);
                compensate_doppler(&rx, trial.sample_rate, doppler_hz)
            }
            None => {
                debug!("Too few samples ({}) for Doppler estimation", rx.len());
                rx
            }
        }
    }

    /// Channel bits before FEC: Doppler correction, matched filter, timing
    /// recovery and hard decisions.
    pub fn demodulate(&self, rx: Vec<Complex64>, trial: &TrialConfig) -> Vec<u8> {
        let rx = self.correct_doppler(rx, trial);
        let synchronizer = SymbolSynchronizer::new(
            trial.samples_per_symbol,
            self.config.timing_window_symbols,
        );
        let symbols = synchronizer.synchronize(&rx);
        hard_decision(&symbols)
    }

    /// Full chain: demodulate then FEC decode.
    pub fn decode(&self, rx: Vec<Complex64>, trial: &TrialConfig) -> Vec<u8> {
        let bits = self.demodulate(rx, trial);
        let fec = FecStage::for_scheme(trial.scheme, self.config.rs_parity);
        fec.decode(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_correction::CodingScheme;
    use std::f64::consts::PI;

    fn modulate(bits: &[u8], sps: usize, fs: f64, doppler_hz: f64) -> Vec<Complex64> {
        bits.iter()
            .flat_map(|&b| std::iter::repeat_n(if b == 1 { 1.0 } else { -1.0 }, sps))
            .enumerate()
            .map(|(n, level)| {
                Complex64::from_polar(level, 2.0 * PI * doppler_hz * n as f64 / fs)
            })
            .collect()
    }

    fn pattern(n: usize) -> Vec<u8> {
        (0..n).map(|i| ((i * 7 + i / 3) % 2) as u8).collect()
    }

    #[test]
    fn test_clean_trial_decodes_exactly() {
        let bits = pattern(200);
        let trial = TrialConfig::default();
        let rx = modulate(&bits, trial.samples_per_symbol, trial.sample_rate, 0.0);
        assert_eq!(Receiver::default().decode(rx, &trial), bits);
    }

    #[test]
    fn test_doppler_only_applied_when_tagged() {
        let trial = TrialConfig::default();
        let rx = modulate(&[1, 0, 1], 4, 1000.0, 50.0);
        let out = Receiver::default().correct_doppler(rx.clone(), &trial);
        assert_eq!(out, rx);
    }

    #[test]
    fn test_reed_solomon_scheme_runs_fec() {
        use crate::error_correction::bits::unpack_bits;

        let data = b"downlink";
        let encoder = reed_solomon::Encoder::new(4);
        let encoded = encoder.encode(data);
        let mut codeword = data.to_vec();
        codeword.extend_from_slice(encoded.ecc());
        let mut channel_bits = unpack_bits(&codeword);
        channel_bits[10] ^= 1;

        let trial = TrialConfig {
            scheme: CodingScheme::ReedSolomon,
            ..TrialConfig::default()
        };
        let rx = modulate(&channel_bits, trial.samples_per_symbol, trial.sample_rate, 0.0);
        assert_eq!(Receiver::default().decode(rx, &trial), unpack_bits(data));
    }
}
