//! Doppler (carrier frequency offset) estimation and compensation.
//!
//! The estimator works on a whole recording at once: Hamming window, one
//! FFT over all samples, magnitude peak search, then parabolic refinement
//! around the peak. The refined index is snapped back onto the FFT
//! frequency grid, so the estimate resolution is one bin (`fs / N`).

use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use tracing::debug;

/// Symmetric Hamming window of length `n`
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

/// Frequency (Hz) of bin `k` in an `n`-point FFT sampled at `fs`.
///
/// Bins above `(n - 1) / 2` map to negative frequencies.
pub fn fft_bin_frequency(k: usize, n: usize, fs: f64) -> f64 {
    let k = k as i64;
    let n_i = n as i64;
    let signed = if k <= (n_i - 1) / 2 { k } else { k - n_i };
    signed as f64 * fs / n as f64
}

/// Fractional bin offset of the vertex of the parabola through
/// `(-1, alpha)`, `(0, beta)`, `(1, gamma)`.
fn parabolic_offset(alpha: f64, beta: f64, gamma: f64) -> f64 {
    let denom = alpha - 2.0 * beta + gamma;
    let p = 0.5 * (alpha - gamma) / denom;
    // flat neighbourhood: keep the raw peak
    if p.is_finite() { p } else { 0.0 }
}

/// Snap a fractional bin index onto the `n`-point grid. Halves round to
/// the even bin.
fn nearest_bin(refined: f64, n: usize) -> usize {
    (refined.round_ties_even() as i64).rem_euclid(n as i64) as usize
}

fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    best_idx
}

/// Estimate the frequency offset (Hz) of `rx` sampled at `fs`.
///
/// Returns `None` when fewer than two samples are available.
pub fn estimate_doppler(rx: &[Complex64], fs: f64) -> Option<f64> {
    let n = rx.len();
    if n < 2 {
        return None;
    }

    let window = hamming(n);
    let mut spectrum: Vec<Complex64> = rx
        .iter()
        .zip(window.iter())
        .map(|(&s, &w)| s * w)
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut spectrum);

    let mag: Vec<f64> = spectrum.iter().map(|c| c.norm()).collect();
    let peak = argmax(&mag);

    // DC peak: no lower neighbour to interpolate with
    if peak == 0 {
        return Some(fft_bin_frequency(0, n, fs));
    }

    let alpha = mag[peak - 1];
    let beta = mag[peak];
    let gamma = mag[(peak + 1) % n];
    let refined = peak as f64 + parabolic_offset(alpha, beta, gamma);
    let doppler_hz = fft_bin_frequency(nearest_bin(refined, n), n, fs);
    debug!(
        "Doppler peak bin {} (refined {:.3}) -> {:.2} Hz",
        peak, refined, doppler_hz
    );
    Some(doppler_hz)
}

/// De-rotate `rx` by `doppler_hz`: sample `n` is multiplied by
/// `exp(-j 2 pi f n / fs)`.
pub fn compensate_doppler(
    rx: &[Complex64],
    fs: f64,
    doppler_hz: f64,
) -> Vec<Complex64> {
    rx.iter()
        .enumerate()
        .map(|(n, &s)| {
            let t = n as f64 / fs;
            s * Complex64::from_polar(1.0, -2.0 * PI * doppler_hz * t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_bin_ties_to_even() {
        assert_eq!(nearest_bin(2.5, 8), 2);
        assert_eq!(nearest_bin(3.5, 8), 4);
        assert_eq!(nearest_bin(4.49, 8), 4);
        // wraps past the last bin
        assert_eq!(nearest_bin(7.6, 8), 0);
        assert_eq!(nearest_bin(-0.4, 8), 0);
    }

    fn tone(freq: f64, fs: f64, n: usize) -> Vec<Complex64> {
        (0..n)
            .map(|i| Complex64::from_polar(1.0, 2.0 * PI * freq * i as f64 / fs))
            .collect()
    }

    #[test]
    fn test_fft_bin_frequency_layout() {
        // n = 8, fs = 8: [0, 1, 2, 3, -4, -3, -2, -1]
        let freqs: Vec<f64> = (0..8).map(|k| fft_bin_frequency(k, 8, 8.0)).collect();
        assert_eq!(freqs, vec![0.0, 1.0, 2.0, 3.0, -4.0, -3.0, -2.0, -1.0]);

        // odd length: [0, 1, 2, -2, -1]
        let freqs: Vec<f64> = (0..5).map(|k| fft_bin_frequency(k, 5, 5.0)).collect();
        assert_eq!(freqs, vec![0.0, 1.0, 2.0, -2.0, -1.0]);
    }

    #[test]
    fn test_hamming_endpoints() {
        let w = hamming(11);
        assert!((w[0] - 0.08).abs() < 1e-12);
        assert!((w[10] - 0.08).abs() < 1e-12);
        assert!((w[5] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_tone_within_one_bin() {
        let fs = 10_000.0;
        let n = 1000;
        let bin_width = fs / n as f64;

        for &f0 in &[1234.5, 2500.0, -777.0, 40.0] {
            let est = estimate_doppler(&tone(f0, fs, n), fs).unwrap();
            assert!(
                (est - f0).abs() < bin_width,
                "f0 = {f0}, estimate = {est}"
            );
        }
    }

    #[test]
    fn test_compensation_removes_offset() {
        let fs = 10_000.0;
        let n = 1000;
        let rx = tone(1232.0, fs, n);

        let est = estimate_doppler(&rx, fs).unwrap();
        let corrected = compensate_doppler(&rx, fs, est);
        let residual = estimate_doppler(&corrected, fs).unwrap();

        assert!(residual.abs() < fs / n as f64, "residual = {residual}");
    }

    #[test]
    fn test_dc_peak_returns_zero() {
        let rx = vec![Complex64::new(1.0, 0.0); 64];
        assert_eq!(estimate_doppler(&rx, 1000.0), Some(0.0));
    }

    #[test]
    fn test_too_short_signal() {
        assert_eq!(estimate_doppler(&[], 1000.0), None);
        assert_eq!(estimate_doppler(&[Complex64::new(1.0, 0.0)], 1000.0), None);
    }

    #[test]
    fn test_compensation_is_unit_magnitude_rotation() {
        let rx = vec![Complex64::new(0.5, -0.5); 16];
        let out = compensate_doppler(&rx, 100.0, 12.5);
        assert_eq!(out.len(), rx.len());
        for (a, b) in rx.iter().zip(out.iter()) {
            assert!((a.norm() - b.norm()).abs() < 1e-12);
        }
        assert!((out[0] - rx[0]).norm() < 1e-12);
    }
}
