use serde::Serialize;

/// Bit and frame error counts for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorRates {
    pub bit_errors: usize,
    /// Bits compared: the shorter of the two sequences
    pub compared_bits: usize,
    /// `bit_errors / compared_bits`, NaN when nothing was compared
    pub ber: f64,
    /// 1 if any bit differs, else 0
    pub fer: u8,
}

/// Compare decoded bits against ground truth over their common prefix.
pub fn compare_bits(decoded: &[u8], truth: &[u8]) -> ErrorRates {
    let compared_bits = decoded.len().min(truth.len());
    let bit_errors = decoded
        .iter()
        .zip(truth.iter())
        .filter(|(a, b)| a != b)
        .count();
    let ber = if compared_bits > 0 {
        bit_errors as f64 / compared_bits as f64
    } else {
        f64::NAN
    };
    ErrorRates {
        bit_errors,
        compared_bits,
        ber,
        fer: u8::from(bit_errors > 0),
    }
}

/// Arithmetic mean; `None` for an empty slice. NaN inputs propagate.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Scientific notation with two decimals and a signed two-digit exponent,
/// e.g. `2.00e-01`.
pub fn format_sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let raw = format!("{:.2e}", value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}
