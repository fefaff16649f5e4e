//! Progress reporting for backup and restore operations.
//!
//! Bars are only created when the caller enables progress, so library
//! users and tests stay silent by default.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const ARCHIVE_TEMPLATE: &str = "{msg} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)";
const EXTRACT_TEMPLATE: &str = "{msg} [{bar:40.green/blue}] {pos}/{len} members ({percent}%)";

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Progress reporter for backup operations.
#[derive(Debug, Clone)]
pub struct BackupProgress {
    multi: Arc<MultiProgress>,
    scan_bar: Option<ProgressBar>,
    archive_bar: Option<ProgressBar>,
}

impl BackupProgress {
    pub fn new() -> Self {
        Self {
            multi: Arc::new(MultiProgress::new()),
            scan_bar: None,
            archive_bar: None,
        }
    }

    /// Starts the scanning phase spinner.
    pub fn start_scan(&mut self, message: &str) {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        self.scan_bar = Some(bar);
    }

    pub fn finish_scan(&self, message: &str) {
        if let Some(bar) = &self.scan_bar {
            bar.finish_with_message(message.to_string());
        }
    }

    /// Starts the archive phase with a known file count.
    pub fn start_archive(&mut self, total_files: u64, message: &str) {
        let bar = self.multi.add(ProgressBar::new(total_files));
        bar.set_style(bar_style(ARCHIVE_TEMPLATE));
        bar.set_message(message.to_string());
        self.archive_bar = Some(bar);
    }

    pub fn inc_archive(&self) {
        if let Some(bar) = &self.archive_bar {
            bar.inc(1);
        }
    }

    pub fn finish_archive(&self, message: &str) {
        if let Some(bar) = &self.archive_bar {
            bar.finish_with_message(message.to_string());
        }
    }

    /// Clears every bar, used on both success and failure.
    pub fn finish_all(&self) {
        if let Some(bar) = &self.scan_bar {
            bar.finish_and_clear();
        }
        if let Some(bar) = &self.archive_bar {
            bar.finish_and_clear();
        }
    }
}

impl Default for BackupProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress reporter for restore operations.
#[derive(Debug, Clone)]
pub struct RestoreProgress {
    multi: Arc<MultiProgress>,
    extract_bar: Option<ProgressBar>,
}

impl RestoreProgress {
    pub fn new() -> Self {
        Self {
            multi: Arc::new(MultiProgress::new()),
            extract_bar: None,
        }
    }

    /// Starts the extraction phase with a known member count.
    pub fn start_extract(&mut self, total_members: u64, message: &str) {
        let bar = self.multi.add(ProgressBar::new(total_members));
        bar.set_style(bar_style(EXTRACT_TEMPLATE));
        bar.set_message(message.to_string());
        self.extract_bar = Some(bar);
    }

    pub fn inc_extract(&self) {
        if let Some(bar) = &self.extract_bar {
            bar.inc(1);
        }
    }

    pub fn finish_extract(&self, message: &str) {
        if let Some(bar) = &self.extract_bar {
            bar.finish_with_message(message.to_string());
        }
    }

    pub fn finish_all(&self) {
        if let Some(bar) = &self.extract_bar {
            bar.finish_and_clear();
        }
    }
}

impl Default for RestoreProgress {
    fn default() -> Self {
        Self::new()
    }
}
