use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{ReceiverError, Result};
use crate::error_correction::CodingScheme;
use crate::utils::consts::*;

/// Run-wide receiver settings, shared by every trial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Reed-Solomon parity symbols per block
    pub rs_parity: usize,
    /// Symbol periods searched for the timing phase
    pub timing_window_symbols: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            rs_parity: RS_PARITY_SYMBOLS,
            timing_window_symbols: TIMING_WINDOW_SYMBOLS,
        }
    }
}

/// Per-trial settings read from `meta.json`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialConfig {
    pub samples_per_symbol: usize,
    /// Hz
    pub sample_rate: f64,
    /// Free-form channel impairment tag, e.g. `"doppler"`
    pub impairment: Option<String>,
    pub scheme: CodingScheme,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            samples_per_symbol: DEFAULT_SAMPLES_PER_SYMBOL,
            sample_rate: DEFAULT_SAMPLE_RATE,
            impairment: None,
            scheme: CodingScheme::None,
        }
    }
}

/// Integer-like metadata value: JSON integer, float (truncated), or a
/// numeric string.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

impl TrialConfig {
    /// Build the configuration of the trial at `trial_dir` from its metadata
    /// object. Missing keys take their defaults; the coding scheme falls back
    /// to the directory name when `scheme` is absent.
    pub fn from_metadata(
        metadata: &Map<String, Value>,
        trial_dir: &Path,
    ) -> Result<Self> {
        let defaults = Self::default();

        let samples_per_symbol = match metadata.get("samples_per_symbol") {
            None | Some(Value::Null) => defaults.samples_per_symbol,
            Some(v) => {
                let sps = as_integer(v).ok_or_else(|| {
                    ReceiverError::InvalidConfig(format!(
                        "samples_per_symbol is not an integer: {}",
                        v
                    ))
                })?;
                if sps <= 0 {
                    return Err(ReceiverError::InvalidConfig(format!(
                        "samples_per_symbol must be positive, got {}",
                        sps
                    )));
                }
                sps as usize
            }
        };

        let sample_rate = match metadata.get("sample_rate") {
            None | Some(Value::Null) => defaults.sample_rate,
            Some(v) => {
                let fs = as_integer(v).ok_or_else(|| {
                    ReceiverError::InvalidConfig(format!(
                        "sample_rate is not an integer: {}",
                        v
                    ))
                })?;
                if fs <= 0 {
                    return Err(ReceiverError::InvalidConfig(format!(
                        "sample_rate must be positive, got {}",
                        fs
                    )));
                }
                fs as f64
            }
        };

        let impairment = metadata
            .get("impairment")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .filter(|s| !s.is_empty());

        let scheme = match metadata.get("scheme") {
            None | Some(Value::Null) => CodingScheme::infer_from_path(trial_dir),
            Some(v) => serde_json::from_value(v.clone()).map_err(|e| {
                ReceiverError::InvalidConfig(format!("unknown scheme {}: {}", v, e))
            })?,
        };

        Ok(Self {
            samples_per_symbol,
            sample_rate,
            impairment,
            scheme,
        })
    }

    /// Doppler compensation runs only for `impairment == "doppler"`
    /// (case-insensitive).
    pub fn has_doppler(&self) -> bool {
        self.impairment
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(DOPPLER_IMPAIRMENT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = TrialConfig::from_metadata(&Map::new(), Path::new("trial")).unwrap();
        assert_eq!(cfg, TrialConfig::default());
        assert_eq!(cfg.samples_per_symbol, 8);
        assert_eq!(cfg.sample_rate, 10_000.0);
        assert!(!cfg.has_doppler());
    }

    #[test]
    fn test_numeric_coercion() {
        let m = meta(json!({"samples_per_symbol": 4.9, "sample_rate": "48000"}));
        let cfg = TrialConfig::from_metadata(&m, Path::new("t")).unwrap();
        assert_eq!(cfg.samples_per_symbol, 4);
        assert_eq!(cfg.sample_rate, 48_000.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for bad in [
            json!({"samples_per_symbol": 0}),
            json!({"samples_per_symbol": "eight"}),
            json!({"sample_rate": -5}),
            json!({"scheme": "turbo"}),
        ] {
            assert!(TrialConfig::from_metadata(&meta(bad), Path::new("t")).is_err());
        }
    }

    #[test]
    fn test_doppler_case_insensitive() {
        let m = meta(json!({"impairment": "DoPpLeR"}));
        assert!(TrialConfig::from_metadata(&m, Path::new("t")).unwrap().has_doppler());
        let m = meta(json!({"impairment": "awgn"}));
        assert!(!TrialConfig::from_metadata(&m, Path::new("t")).unwrap().has_doppler());
    }

    #[test]
    fn test_explicit_scheme_beats_path() {
        let m = meta(json!({"scheme": "none"}));
        let cfg = TrialConfig::from_metadata(&m, Path::new("set/reed_solomon/p1")).unwrap();
        assert_eq!(cfg.scheme, CodingScheme::None);

        let cfg =
            TrialConfig::from_metadata(&Map::new(), Path::new("set/reed_solomon/p1")).unwrap();
        assert_eq!(cfg.scheme, CodingScheme::ReedSolomon);
    }
}
