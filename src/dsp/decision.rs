/// Hard BPSK decision: `1` for a positive sample, `0` otherwise.
///
/// Exactly zero (and NaN) decide to `0`.
pub fn hard_decision(symbols: &[f64]) -> Vec<u8> {
    symbols.iter().map(|&s| u8::from(s > 0.0)).collect()
}
