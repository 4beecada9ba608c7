//! Progress reporting: count-style bars for the collection and classification passes.

use indicatif::{ProgressBar, ProgressStyle};

fn count_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
}

/// Count-style progress bar (items processed out of total), with an optional label.
pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(count_style());
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// A small wrapper around `indicatif` progress bars.
/// - `inc_items(delta)` increments progress
/// - `finish(msg)` finalizes the bar with a message
///
/// `hidden()` gives the same API with nothing drawn, so callers don't branch.
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    pub fn count<T: Into<String>>(label: T, total: u64) -> Self {
        Self { pb: make_count_progress(total, &label.into()) }
    }

    pub fn hidden() -> Self {
        Self { pb: ProgressBar::hidden() }
    }

    /// `count` when `enabled`, otherwise `hidden`.
    pub fn count_if<T: Into<String>>(enabled: bool, label: T, total: u64) -> Self {
        if enabled { Self::count(label, total) } else { Self::hidden() }
    }

    #[inline]
    pub fn inc_items(&self, delta: u64) {
        self.pb.inc(delta);
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    pub fn finish<T: Into<String>>(&self, msg: T) {
        self.pb.finish_with_message(msg.into());
    }
}
