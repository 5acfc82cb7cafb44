//! # Optimizer Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `batch_optimizer`: Orchestratore principale e pool di worker
//! - `task_optimizer`: Worker per singoli file
//! - `progress_tracker`: Osservatori dei completamenti (statistiche, progress bar)

pub mod batch_optimizer;
pub mod progress_tracker;
pub mod task_optimizer;

pub use batch_optimizer::{BatchOptimizer, BatchReport, WorkerPool};
pub use progress_tracker::{CompletionObserver, ProgressTracker};
pub use task_optimizer::{FileFailure, FileReport, TaskOptimizer};
