use doppler_rx::config::TrialConfig;
use doppler_rx::dsp::{compensate_doppler, estimate_doppler};
use doppler_rx::error_correction::CodingScheme;
use doppler_rx::evaluation::compare_bits;
use doppler_rx::Receiver;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

fn bpsk(bits: &[u8], sps: usize) -> Vec<Complex64> {
    bits.iter()
        .flat_map(|&b| {
            let level = if b == 1 { 1.0 } else { -1.0 };
            std::iter::repeat_n(Complex64::new(level, 0.0), sps)
        })
        .collect()
}

fn add_awgn(rx: &mut [Complex64], sigma: f64, rng: &mut StdRng) {
    let normal = Normal::new(0.0, sigma).unwrap();
    for s in rx.iter_mut() {
        *s += Complex64::new(normal.sample(rng), normal.sample(rng));
    }
}

#[test]
fn noisy_trial_decodes_without_errors() {
    let mut rng = StdRng::seed_from_u64(7);
    // alternating preamble gives timing recovery transitions to lock on
    let bits: Vec<u8> = (0..2000)
        .map(|i| if i < 16 { (i % 2) as u8 } else { u8::from(rng.random_bool(0.5)) })
        .collect();

    let trial = TrialConfig::default();
    let mut rx = bpsk(&bits, trial.samples_per_symbol);
    // receiver starts three samples into the first symbol
    rx.drain(..3);
    add_awgn(&mut rx, 0.3, &mut rng);

    let decoded = Receiver::default().decode(rx, &trial);
    let rates = compare_bits(&decoded, &bits);
    assert_eq!(rates.compared_bits, bits.len());
    assert_eq!(rates.bit_errors, 0);
}

#[test]
fn doppler_tagged_trial_is_derotated() {
    let fs = 10_000.0;
    let n = 4000;
    let offset_hz = 250.0;

    // unmodulated carrier carrying all-ones
    let rx: Vec<Complex64> = (0..n)
        .map(|i| Complex64::from_polar(1.0, 2.0 * PI * offset_hz * i as f64 / fs))
        .collect();

    let tagged = TrialConfig {
        impairment: Some("Doppler".into()),
        ..TrialConfig::default()
    };
    let bits = Receiver::default().decode(rx.clone(), &tagged);
    assert_eq!(bits.len(), n / tagged.samples_per_symbol);
    assert!(bits.iter().all(|&b| b == 1));

    // untagged: offset left in place, decisions scramble
    let untagged = TrialConfig::default();
    let bits = Receiver::default().decode(rx, &untagged);
    assert!(bits.iter().any(|&b| b == 0));
}

#[test]
fn estimate_then_compensate_leaves_no_offset() {
    let fs = 8_000.0;
    let n = 2048;
    let mut rng = StdRng::seed_from_u64(11);
    let mut rx: Vec<Complex64> = (0..n)
        .map(|i| Complex64::from_polar(1.0, 2.0 * PI * -913.7 * i as f64 / fs))
        .collect();
    add_awgn(&mut rx, 0.1, &mut rng);

    let est = estimate_doppler(&rx, fs).unwrap();
    assert!((est + 913.7).abs() < fs / n as f64);

    let residual = estimate_doppler(&compensate_doppler(&rx, fs, est), fs).unwrap();
    assert!(residual.abs() <= fs / n as f64);
}

#[test]
fn convolutional_trial_is_passed_through() {
    let bits: Vec<u8> = (0..64).map(|i| ((i * 5 + i / 4) % 2) as u8).collect();
    let coded = TrialConfig {
        scheme: CodingScheme::Convolutional,
        ..TrialConfig::default()
    };
    let receiver = Receiver::default();
    let rx = bpsk(&bits, coded.samples_per_symbol);
    assert_eq!(receiver.decode(rx.clone(), &coded), receiver.demodulate(rx, &coded));
}
