//! Progress reporting for the staging transfer

use indicatif::{ProgressBar, ProgressStyle};

/// Progress of rows copied from engine1 into engine2's staging table
#[derive(Debug)]
pub struct TransferProgress {
    pb: Option<ProgressBar>,
    transferred: u64,
}

impl TransferProgress {
    /// Progress bar for a transfer of `total_rows`
    pub fn new(total_rows: u64, message: &str) -> Self {
        Self {
            pb: Some(create_progress_bar(total_rows, message)),
            transferred: 0,
        }
    }

    /// Tracks counts only, draws nothing
    pub fn hidden() -> Self {
        Self {
            pb: None,
            transferred: 0,
        }
    }

    pub fn inc(&mut self, rows: u64) {
        self.transferred += rows;
        if let Some(pb) = &self.pb {
            pb.set_position(self.transferred);
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(pb) = self.pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for TransferProgress {
    fn drop(&mut self) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a progress bar with known total
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} ({per_sec}) {eta} {msg}")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
