//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche di ottimizzazione.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - `Stats`: coppia (before, after) in byte per file e per il totale
//! - `StatsAggregator`: accumula le `Stats` di ogni file completato
//!
//! ## Invarianti:
//! - Su un fallimento `before == after`: nessuna variazione registrata
//! - `reduction_pct()` vale 0 quando `before == 0`
//! - L'aggregazione è una somma: l'ordine di completamento non conta
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [████████████████████████████████████████] 150/150 (100%) 3.42 MB saved
//! ```
//!
//! ## Esempio:
//! ```rust,ignore
//! let mut total = Stats::default();
//! total += Stats::new(1000, 600);
//! total += Stats::unchanged(500);
//! assert_eq!(total.reduction(), 400);
//! ```

use crate::file_manager::FileManager;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::iter::Sum;
use std::ops::AddAssign;
use std::time::Duration;

/// Size of a file (or a set of files) before and after optimization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub before: u64,
    pub after: u64,
}

impl Stats {
    pub fn new(before: u64, after: u64) -> Self {
        Self { before, after }
    }

    /// Stats for a file the codec did not change
    pub fn unchanged(size: u64) -> Self {
        Self { before: size, after: size }
    }

    /// Bytes saved, negative if the file grew
    pub fn reduction(&self) -> i64 {
        self.before as i64 - self.after as i64
    }

    pub fn reduction_pct(&self) -> f64 {
        if self.before == 0 {
            return 0.0;
        }
        (self.reduction() as f64 / self.before as f64) * 100.0
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.before += other.before;
        self.after += other.after;
    }
}

impl Sum for Stats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut total, stats| {
            total += stats;
            total
        })
    }
}

/// Running totals for a batch
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatsAggregator {
    pub total: Stats,
    pub files_processed: usize,
    pub files_failed: usize,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stats: Stats, failed: bool) {
        self.total += stats;
        self.files_processed += 1;
        if failed {
            self.files_failed += 1;
        }
    }
}

/// Manages the live progress bar for a batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A progress manager that draws nothing
    pub fn hidden(total_files: u64) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(total_files), ProgressDrawTarget::hidden()),
        }
    }

    /// Count one more completed file and show the cumulative savings
    pub fn advance(&self, saved_so_far: i64) {
        self.bar.inc(1);
        let saved = if saved_so_far >= 0 {
            format!("{} saved", FileManager::format_size(saved_so_far as u64))
        } else {
            format!("{} grown", FileManager::format_size(saved_so_far.unsigned_abs()))
        };
        self.bar.set_message(saved);
    }

    /// Print a line above the bar without breaking it
    pub fn println(&self, message: &str) {
        self.bar.println(message);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
