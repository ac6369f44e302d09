use num_complex::Complex64;
use tracing::debug;

/// Rectangular-pulse matched filter with energy-based symbol timing.
///
/// The filter is a boxcar of `samples_per_symbol` unit taps (a running sum),
/// which is matched to rectangular BPSK pulses. Timing recovery tries every
/// sampling phase in `[0, samples_per_symbol)` and keeps the one whose first
/// `window_symbols` samples carry the most energy. Ties go to the lowest
/// phase.
#[derive(Debug, Clone)]
pub struct SymbolSynchronizer {
    samples_per_symbol: usize,
    window_symbols: usize,
}

impl SymbolSynchronizer {
    /// `samples_per_symbol` must be non-zero; a zero `window_symbols` is
    /// treated as one symbol.
    pub fn new(samples_per_symbol: usize, window_symbols: usize) -> Self {
        Self {
            samples_per_symbol: samples_per_symbol.max(1),
            window_symbols: window_symbols.max(1),
        }
    }

    /// Causal boxcar filter: `y[n] = x[n] + x[n-1] + ... + x[n-sps+1]`
    /// with samples before the start taken as zero.
    pub fn matched_filter(&self, rx: &[Complex64]) -> Vec<Complex64> {
        let sps = self.samples_per_symbol;
        let mut acc = Complex64::new(0.0, 0.0);
        let mut filtered = Vec::with_capacity(rx.len());
        for (n, &x) in rx.iter().enumerate() {
            acc += x;
            if n >= sps {
                acc -= rx[n - sps];
            }
            filtered.push(acc);
        }
        filtered
    }

    /// Energy (sum of magnitudes) of the filtered signal sampled at `phase`,
    /// over at most `window_symbols` symbol periods. Short signals use
    /// whatever samples exist.
    pub fn phase_energy(&self, filtered: &[Complex64], phase: usize) -> f64 {
        filtered
            .iter()
            .skip(phase)
            .step_by(self.samples_per_symbol)
            .take(self.window_symbols)
            .map(|c| c.norm())
            .sum()
    }

    /// Sampling phase with maximum energy; the first maximum wins.
    pub fn timing_phase(&self, filtered: &[Complex64]) -> usize {
        let mut best_phase = 0;
        let mut best_energy = f64::NEG_INFINITY;
        for phase in 0..self.samples_per_symbol {
            let energy = self.phase_energy(filtered, phase);
            if energy > best_energy {
                best_energy = energy;
                best_phase = phase;
            }
        }
        best_phase
    }

    /// Filter, recover timing, and return one real sample per symbol.
    pub fn synchronize(&self, rx: &[Complex64]) -> Vec<f64> {
        let filtered = self.matched_filter(rx);
        let phase = self.timing_phase(&filtered);
        debug!(
            "Timing phase {} of {} ({} samples)",
            phase,
            self.samples_per_symbol,
            rx.len()
        );

        filtered
            .iter()
            .skip(phase)
            .step_by(self.samples_per_symbol)
            .map(|c| c.re)
            .collect()
    }
}
