// Progress bars using indicatif, all under one MultiProgress.
// A byte bar tracks statement location over the dump; a count bar tracks tables.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProgressManager {
    multi: Option<Arc<MultiProgress>>,
}

impl ProgressManager {
    // If enabled=false, no bars are created.
    pub fn new(enabled: bool) -> Self {
        let multi = if enabled {
            Some(Arc::new(MultiProgress::new()))
        } else {
            None
        };
        Self { multi }
    }

    pub fn is_enabled(&self) -> bool {
        self.multi.is_some()
    }

    // Bar over the bytes of an in-memory dump.
    pub fn new_scan_bar(&self, total_bytes: u64, label: &str) -> Option<ProgressBar> {
        let mp = self.multi.as_ref()?;
        let bar = mp.add(ProgressBar::new(total_bytes));
        bar.set_style(byte_style());
        bar.set_prefix(label.to_string());
        Some(bar)
    }

    // Bar over a count of tables.
    pub fn new_table_bar(&self, total: u64, label: &str) -> Option<ProgressBar> {
        let mp = self.multi.as_ref()?;
        let bar = mp.add(ProgressBar::new(total));
        bar.set_style(count_style());
        bar.set_prefix(label.to_string());
        Some(bar)
    }
}

fn byte_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:20} {bytes:>10}/{total_bytes:<10} [{bar:50}] {percent:>3}%",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█ ")
}

fn count_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:20} {pos:>5}/{len:<5} [{bar:50}] {percent:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█ ")
}
