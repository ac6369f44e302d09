use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Batch pass a progress bar tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Decode,
    Evaluate,
}

impl Pass {
    fn template(self) -> &'static str {
        match self {
            Pass::Decode => "DECODE [{bar:30.cyan}] {percent}% ({pos}/{len} trials) {msg}",
            Pass::Evaluate => "EVAL   [{bar:30.green}] {percent}% ({pos}/{len} trials) {msg}",
        }
    }
}

/// One trial-count bar per pass, drawn on stderr.
///
/// Clones share the same bars, so worker threads can advance them. Progress
/// is cosmetic: a poisoned lock or bad template just means no bar.
#[derive(Clone)]
pub struct ProgressManager {
    mp: MultiProgress,
    bars: Arc<Mutex<HashMap<Pass, ProgressBar>>>,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            bars: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start (or restart) the bar for `pass` over `total` trials.
    pub fn start(&self, pass: Pass, total: u64, message: &str) {
        let Ok(style) = ProgressStyle::default_bar().template(pass.template()) else {
            return;
        };
        let pb = self.mp.add(ProgressBar::new(total));
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        pb.set_message(message.to_string());

        if let Ok(mut bars) = self.bars.lock() {
            if let Some(old) = bars.insert(pass, pb) {
                old.finish_and_clear();
            }
        }
    }

    /// One more trial done.
    pub fn advance(&self, pass: Pass) {
        if let Ok(bars) = self.bars.lock() {
            if let Some(pb) = bars.get(&pass) {
                pb.inc(1);
            }
        }
    }

    /// Finish the bar for `pass`, leaving it on screen.
    pub fn finish(&self, pass: Pass) {
        if let Ok(mut bars) = self.bars.lock() {
            if let Some(pb) = bars.remove(&pass) {
                pb.finish_with_message("done");
            }
        }
    }

    pub fn is_active(&self, pass: Pass) -> bool {
        self.bars
            .lock()
            .map(|bars| bars.contains_key(&pass))
            .unwrap_or(false)
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_lifecycle() {
        let progress = ProgressManager::new();
        assert!(!progress.is_active(Pass::Decode));

        progress.start(Pass::Decode, 3, "set");
        progress.advance(Pass::Decode);
        assert!(progress.is_active(Pass::Decode));
        assert!(!progress.is_active(Pass::Evaluate));

        progress.finish(Pass::Decode);
        assert!(!progress.is_active(Pass::Decode));
        // advancing a finished pass is a no-op
        progress.advance(Pass::Decode);
    }

    #[test]
    fn test_clones_share_bars() {
        let progress = ProgressManager::new();
        let worker = progress.clone();
        progress.start(Pass::Evaluate, 2, "");
        assert!(worker.is_active(Pass::Evaluate));
    }
}
