use num_complex::Complex64;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::TrialConfig;
use crate::dataset::npy;
use crate::error::{ReceiverError, Result};
use crate::utils::consts::{DECODED_FILE, META_FILE, RX_FILE};

static TMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// One reception instance: a directory holding `meta.json` plus raw samples
/// and/or decoded bits.
#[derive(Debug, Clone)]
pub struct Trial {
    dir: PathBuf,
    metadata: Map<String, Value>,
}

impl Trial {
    /// A directory is a trial iff it has metadata and either raw samples or
    /// a decoded-bits artifact.
    pub fn is_trial_dir(dir: &Path) -> bool {
        dir.join(META_FILE).is_file()
            && (dir.join(RX_FILE).is_file() || dir.join(DECODED_FILE).is_file())
    }

    /// Read `meta.json` of the trial at `dir`. Only the JSON shape is checked
    /// here; decoder settings are validated by [`Trial::config`].
    pub fn load(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(META_FILE);
        let text = fs::read_to_string(&meta_path)
            .map_err(|e| ReceiverError::io(&meta_path, e))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| ReceiverError::Json {
            path: meta_path.clone(),
            source: e,
        })?;
        let Value::Object(metadata) = value else {
            return Err(ReceiverError::InvalidMetadata {
                path: meta_path,
                reason: "expected a JSON object".into(),
            });
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            metadata,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Receiver settings for decoding this trial. Fails on an invalid
    /// `samples_per_symbol`, `sample_rate` or `scheme`.
    pub fn config(&self) -> Result<TrialConfig> {
        TrialConfig::from_metadata(&self.metadata, &self.dir)
    }

    pub fn rx_path(&self) -> PathBuf {
        self.dir.join(RX_FILE)
    }

    pub fn decoded_path(&self) -> PathBuf {
        self.dir.join(DECODED_FILE)
    }

    pub fn has_rx(&self) -> bool {
        self.rx_path().is_file()
    }

    pub fn has_decoded(&self) -> bool {
        self.decoded_path().is_file()
    }

    pub fn load_rx(&self) -> Result<Vec<Complex64>> {
        Ok(npy::load(&self.rx_path())?.into_complex())
    }

    /// Decoded bits, masked to their low bit.
    pub fn load_decoded(&self) -> Result<Vec<u8>> {
        npy::load(&self.decoded_path())?.to_bits()
    }

    /// Persist decoded bits.
    ///
    /// The artifact is written to a temporary file in the trial directory and
    /// renamed into place, so concurrent writers never leave a torn file; the
    /// last rename wins.
    pub fn save_decoded(&self, bits: &[u8]) -> Result<PathBuf> {
        let target = self.decoded_path();
        let tmp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            DECODED_FILE,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = npy::save_u8(&tmp, bits) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &target).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ReceiverError::io(&target, e)
        })?;
        Ok(target)
    }
}

/// Trial directories under `root` (root included), in sorted path order.
///
/// Unreadable subdirectories are logged and skipped; only an unusable root
/// is an error.
pub fn discover_trials(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ReceiverError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "dataset root is not a directory"),
        ));
    }

    let mut trials = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() && Trial::is_trial_dir(entry.path()) {
            trials.push(entry.into_path());
        }
    }
    Ok(trials)
}

/// Path of `dir` relative to `root` with `/` separators (`.` for the root).
pub fn relative_label(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
