//! Discovery of the reference bit sequence for a trial.
//!
//! Ground truth is never produced here, only found. Strategies run in a
//! fixed order and the first one yielding a non-empty sequence wins:
//! well-known files, then well-known metadata keys, then any metadata list
//! made only of integer 0/1 values.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use crate::dataset::npy;
use crate::utils::consts::{GROUND_TRUTH_FILES, GROUND_TRUTH_INNER_KEYS, GROUND_TRUTH_KEYS};

/// Where the ground truth of a trial came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum GroundTruthSource {
    File(String),
    MetadataKey(String),
    MetadataScan(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruth {
    pub bits: Vec<u8>,
    pub source: GroundTruthSource,
}

/// One way of locating ground truth. Returns `None` when this strategy has
/// nothing usable, so the resolver can try the next one.
pub trait GroundTruthStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, dir: &Path, metadata: &Map<String, Value>) -> Option<GroundTruth>;
}

/// Coerce a JSON list to bits the way a `uint8` array cast would, then mask
/// to the low bit. Booleans, integers in `0..=255`, finite floats in
/// `[0, 256)` and numeric strings are accepted; anything else fails.
fn coerce_bits(values: &[Value]) -> Option<Vec<u8>> {
    values
        .iter()
        .map(|v| {
            let byte = match v {
                Value::Bool(b) => u8::from(*b),
                Value::Number(n) => {
                    if let Some(u) = n.as_u64() {
                        u8::try_from(u).ok()?
                    } else if n.is_i64() {
                        return None;
                    } else {
                        let f = n.as_f64().filter(|f| f.is_finite())?;
                        if !(0.0..256.0).contains(&f) {
                            return None;
                        }
                        f.trunc() as u8
                    }
                }
                Value::String(s) => s.trim().parse::<u8>().ok()?,
                _ => return None,
            };
            Some(byte & 1)
        })
        .collect()
}

/// Ground-truth `.npy` files inside the trial directory.
pub struct KnownFiles {
    names: &'static [&'static str],
}

impl Default for KnownFiles {
    fn default() -> Self {
        Self {
            names: &GROUND_TRUTH_FILES,
        }
    }
}

impl GroundTruthStrategy for KnownFiles {
    fn name(&self) -> &'static str {
        "known files"
    }

    fn resolve(&self, dir: &Path, _metadata: &Map<String, Value>) -> Option<GroundTruth> {
        for &name in self.names {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            match npy::load(&path).and_then(|data| data.to_bits()) {
                Ok(bits) if !bits.is_empty() => {
                    return Some(GroundTruth {
                        bits,
                        source: GroundTruthSource::File(name.to_string()),
                    });
                }
                Ok(_) => debug!("{} is empty", path.display()),
                Err(e) => debug!("Unusable ground truth {}: {}", path.display(), e),
            }
        }
        None
    }
}

/// Inline bit lists under well-known metadata keys, or nested under
/// `bits`/`data`/`values` when the key holds an object.
pub struct KnownKeys {
    keys: &'static [&'static str],
    inner_keys: &'static [&'static str],
}

impl Default for KnownKeys {
    fn default() -> Self {
        Self {
            keys: &GROUND_TRUTH_KEYS,
            inner_keys: &GROUND_TRUTH_INNER_KEYS,
        }
    }
}

impl GroundTruthStrategy for KnownKeys {
    fn name(&self) -> &'static str {
        "known metadata keys"
    }

    fn resolve(&self, _dir: &Path, metadata: &Map<String, Value>) -> Option<GroundTruth> {
        for &key in self.keys {
            match metadata.get(key) {
                Some(Value::Array(list)) => {
                    if let Some(bits) = coerce_bits(list).filter(|b| !b.is_empty()) {
                        return Some(GroundTruth {
                            bits,
                            source: GroundTruthSource::MetadataKey(key.to_string()),
                        });
                    }
                }
                Some(Value::Object(inner)) => {
                    for &inner_key in self.inner_keys {
                        let Some(Value::Array(list)) = inner.get(inner_key) else {
                            continue;
                        };
                        if let Some(bits) = coerce_bits(list).filter(|b| !b.is_empty()) {
                            return Some(GroundTruth {
                                bits,
                                source: GroundTruthSource::MetadataKey(format!(
                                    "{}.{}",
                                    key, inner_key
                                )),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Last resort: the first metadata value that is a non-empty list of JSON
/// integers, all 0 or 1. Booleans and floats do not qualify.
#[derive(Default)]
pub struct BinaryListScan;

impl GroundTruthStrategy for BinaryListScan {
    fn name(&self) -> &'static str {
        "metadata scan"
    }

    fn resolve(&self, _dir: &Path, metadata: &Map<String, Value>) -> Option<GroundTruth> {
        metadata.iter().find_map(|(key, value)| {
            let list = value.as_array().filter(|l| !l.is_empty())?;
            let bits = list
                .iter()
                .map(|v| match v.as_u64() {
                    Some(b @ (0 | 1)) => Some(b as u8),
                    _ => None,
                })
                .collect::<Option<Vec<u8>>>()?;
            Some(GroundTruth {
                bits,
                source: GroundTruthSource::MetadataScan(key.clone()),
            })
        })
    }
}

/// Ordered chain of [`GroundTruthStrategy`]s.
pub struct GroundTruthResolver {
    strategies: Vec<Box<dyn GroundTruthStrategy>>,
}

impl Default for GroundTruthResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(KnownFiles::default()),
            Box::new(KnownKeys::default()),
            Box::new(BinaryListScan),
        ])
    }
}

impl GroundTruthResolver {
    pub fn new(strategies: Vec<Box<dyn GroundTruthStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, dir: &Path, metadata: &Map<String, Value>) -> Option<GroundTruth> {
        for strategy in &self.strategies {
            if let Some(found) = strategy.resolve(dir, metadata) {
                debug!(
                    "Ground truth for {} via {} ({} bits)",
                    dir.display(),
                    strategy.name(),
                    found.bits.len()
                );
                return Some(found);
            }
        }
        debug!("No ground truth for {}", dir.display());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn meta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_file_beats_metadata() {
        let tmp = TempDir::new().unwrap();
        npy::save_u8(&tmp.path().join("gt_bits.npy"), &[1, 1, 0, 3]).unwrap();
        let m = meta(json!({"tx_bits": [0, 0, 0]}));

        let found = GroundTruthResolver::default().resolve(tmp.path(), &m).unwrap();
        assert_eq!(found.bits, vec![1, 1, 0, 1]);
        assert_eq!(found.source, GroundTruthSource::File("gt_bits.npy".into()));
    }

    #[test]
    fn test_file_order() {
        let tmp = TempDir::new().unwrap();
        npy::save_u8(&tmp.path().join("labels.npy"), &[0]).unwrap();
        npy::save_u8(&tmp.path().join("tx_bits.npy"), &[1]).unwrap();
        let found = KnownFiles::default().resolve(tmp.path(), &Map::new()).unwrap();
        assert_eq!(found.source, GroundTruthSource::File("tx_bits.npy".into()));
    }

    #[test]
    fn test_corrupt_or_empty_file_falls_through() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("tx_bits.npy"), b"garbage").unwrap();
        npy::save_u8(&tmp.path().join("gt_bits.npy"), &[]).unwrap();
        let m = meta(json!({"bits": [1, 0]}));

        let found = GroundTruthResolver::default().resolve(tmp.path(), &m).unwrap();
        assert_eq!(found.bits, vec![1, 0]);
        assert_eq!(found.source, GroundTruthSource::MetadataKey("bits".into()));
    }

    #[test]
    fn test_oversized_header_falls_through() {
        let tmp = TempDir::new().unwrap();
        let mut dict =
            "{'descr': '<f8', 'fortran_order': False, 'shape': (8589934592, 8589934592), }"
                .to_string();
        dict.push('\n');
        let mut file = b"\x93NUMPY\x01\x00".to_vec();
        file.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        file.extend_from_slice(dict.as_bytes());
        file.extend_from_slice(&[0; 8]);
        std::fs::write(tmp.path().join("tx_bits.npy"), file).unwrap();
        npy::save_u8(&tmp.path().join("gt_bits.npy"), &[0, 1, 1]).unwrap();

        let found = GroundTruthResolver::default().resolve(tmp.path(), &Map::new()).unwrap();
        assert_eq!(found.bits, vec![0, 1, 1]);
        assert_eq!(found.source, GroundTruthSource::File("gt_bits.npy".into()));
    }

    #[test]
    fn test_key_order_and_nested_objects() {
        let tmp = TempDir::new().unwrap();
        let m = meta(json!({
            "labels": [0, 0],
            "ground_truth": {"values": [1, 0, 1], "data": ["x"]},
        }));
        let found = KnownKeys::default().resolve(tmp.path(), &m).unwrap();
        assert_eq!(found.bits, vec![1, 0, 1]);
        assert_eq!(
            found.source,
            GroundTruthSource::MetadataKey("ground_truth.values".into())
        );
    }

    #[test]
    fn test_key_coercion() {
        let m = meta(json!({"tx_bits": [true, 2, 3.7, "5", 0]}));
        let found = KnownKeys::default().resolve(Path::new("."), &m).unwrap();
        assert_eq!(found.bits, vec![1, 0, 1, 1, 0]);

        // un-coercible list: next key is tried
        let m = meta(json!({"tx_bits": [1, -1], "gt_bits": [0, 1]}));
        let found = KnownKeys::default().resolve(Path::new("."), &m).unwrap();
        assert_eq!(found.source, GroundTruthSource::MetadataKey("gt_bits".into()));
    }

    #[test]
    fn test_scan_requires_binary_integers() {
        let m = meta(json!({
            "gains": [0.5, 1.0],
            "flags": [true, false],
            "symbols": [0, 1, 2],
            "payload": [0, 1, 1, 0],
            "later": [1, 1],
        }));
        let found = GroundTruthResolver::default().resolve(Path::new("."), &m).unwrap();
        assert_eq!(found.bits, vec![0, 1, 1, 0]);
        assert_eq!(found.source, GroundTruthSource::MetadataScan("payload".into()));
    }

    #[test]
    fn test_nothing_found() {
        let tmp = TempDir::new().unwrap();
        let m = meta(json!({"bits": [], "samples_per_symbol": 8}));
        assert!(GroundTruthResolver::default().resolve(tmp.path(), &m).is_none());
    }
}
