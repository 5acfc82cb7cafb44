//! # Progress Tracking Module
//!
//! Osservatori degli eventi di completamento file.
//!
//! Il driver invoca `on_file_done` una volta per ogni file, nell'ordine di
//! completamento. Aggregatore statistiche e progress bar sono due
//! subscriber indipendenti dello stesso evento.

use crate::{
    file_manager::FileManager,
    optimizer::task_optimizer::FileReport,
    progress::{ProgressManager, StatsAggregator},
};
use tracing::{debug, info, warn};

/// Subscriber to per-file completion events
pub trait CompletionObserver {
    fn on_file_done(&mut self, report: &FileReport);
}

impl CompletionObserver for StatsAggregator {
    fn on_file_done(&mut self, report: &FileReport) {
        self.add(report.stats(), report.is_failure());
    }
}

/// Live counter plus optional per-file lines
pub struct ProgressTracker {
    progress: ProgressManager,
    visible: bool,
    verbose: bool,
    bytes_saved: i64,
}

impl ProgressTracker {
    /// Crea un nuovo tracker
    pub fn new(total_files: usize, show_progress: bool, verbose: bool) -> Self {
        let progress = if show_progress {
            ProgressManager::new(total_files as u64)
        } else {
            ProgressManager::hidden(total_files as u64)
        };

        Self {
            progress,
            visible: show_progress,
            verbose,
            bytes_saved: 0,
        }
    }

    /// File completati finora
    pub fn completed(&self) -> u64 {
        self.progress.position()
    }

    /// Byte risparmiati finora
    pub fn bytes_saved(&self) -> i64 {
        self.bytes_saved
    }

    /// Finalizza progress bar
    pub fn finish(&self) {
        self.progress.finish();
    }

    fn report_line(&self, report: &FileReport) -> String {
        match &report.outcome {
            Ok(stats) if stats.reduction() != 0 => format!(
                "{} optimized: {:+.1}% ({:+} bytes)",
                report.file_name(),
                -stats.reduction_pct(),
                -stats.reduction()
            ),
            Ok(_) => format!("{} already optimal", report.file_name()),
            Err(failure) => format!("Failed {}: {}", report.path.display(), failure.error),
        }
    }
}

impl CompletionObserver for ProgressTracker {
    fn on_file_done(&mut self, report: &FileReport) {
        self.bytes_saved += report.stats().reduction();
        self.progress.advance(self.bytes_saved);

        if !self.verbose {
            debug!(
                "{} done ({} saved so far)",
                report.file_name(),
                FileManager::format_size(self.bytes_saved.max(0) as u64)
            );
            return;
        }

        let line = self.report_line(report);
        if self.visible {
            self.progress.println(&line);
        } else if report.is_failure() {
            warn!("{}", line);
        } else {
            info!("{}", line);
        }
    }
}
