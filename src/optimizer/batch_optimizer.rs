//! # Batch Optimizer Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli specializzati.
//!
//! ## Fasi di un run:
//! Idle → Scanning → Dispatching → Aggregating → Reporting → Done
//!
//! 1. Trova i `.png` nella directory (non ricorsivo); nessun file = fine pulita
//! 2. Verifica che il codec sia disponibile; altrimenti errore fatale, nessun file toccato
//! 3. Dimensiona il pool di worker (fisso per tutto il run)
//! 4. Un task per file; i risultati arrivano in ordine di completamento
//! 5. Ogni risultato va agli osservatori (statistiche + progress bar)
//! 6. Report finale con tempo, risparmio e throughput
//!
//! Nessuno stato persiste tra un run e l'altro: un nuovo run rielabora tutto.

use crate::{
    codec::PngCodec,
    config::Config,
    error::OptimizeError,
    file_manager::FileManager,
    optimizer::{
        progress_tracker::{CompletionObserver, ProgressTracker},
        task_optimizer::{FileReport, TaskOptimizer},
    },
    progress::{Stats, StatsAggregator},
};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info};

/// Fixed-size worker pool: at most `size` files are inside the codec at once
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for a free worker slot
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Ok(self.semaphore.clone().acquire_owned().await?)
    }

    /// Slot liberi in questo momento
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Stop handing out slots: pending and future `acquire` calls fail
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub files: usize,
    pub failed: usize,
    pub total: Stats,
    pub elapsed: Duration,
    pub workers: usize,
}

impl BatchReport {
    pub fn files_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);
        let saved = self.total.reduction();

        writeln!(f, "{}", rule)?;
        writeln!(f, "✓ Optimized {} files in {:.1}s", self.files, self.elapsed.as_secs_f64())?;
        if self.failed > 0 {
            writeln!(f, " Failed: {} (left unchanged)", self.failed)?;
        }
        writeln!(
            f,
            " Saved: {:.1}% ({} bytes, {})",
            self.total.reduction_pct(),
            saved,
            FileManager::format_size(saved.max(0) as u64)
        )?;
        writeln!(
            f,
            " Final size: {} bytes (was {})",
            self.total.after, self.total.before
        )?;
        writeln!(f, " Speed: {:.1} files/sec", self.files_per_sec())?;
        write!(f, "{}", rule)
    }
}

/// Orchestratore principale
pub struct BatchOptimizer {
    config: Arc<Config>,
    codec: Arc<dyn PngCodec>,
}

impl BatchOptimizer {
    /// Crea nuova istanza dell'ottimizzatore; la configurazione da qui in poi è di sola lettura
    pub fn new(config: Config, codec: Arc<dyn PngCodec>) -> Self {
        Self {
            config: Arc::new(config),
            codec,
        }
    }

    /// Esegue il processo di ottimizzazione.
    ///
    /// `Ok(None)` when the directory holds no PNG files.
    pub async fn run(&self, dir: &Path) -> Result<Option<BatchReport>> {
        let files = FileManager::find_png_files(dir)?;

        if files.is_empty() {
            println!("No .png files found in {}", dir.display());
            return Ok(None);
        }

        self.check_dependencies()?;

        let pool = WorkerPool::new(self.config.max_workers.resolve());
        self.log_configuration(&files, &pool);

        let start_time = Instant::now();
        let mut aggregator = StatsAggregator::new();
        let mut tracker = ProgressTracker::new(files.len(), self.config.show_progress, self.config.verbose);

        let mut observers: [&mut dyn CompletionObserver; 2] = [&mut aggregator, &mut tracker];
        let outcome = self.process_files_concurrently(files, &pool, &mut observers).await;
        tracker.finish();
        outcome?;

        Ok(Some(BatchReport {
            files: aggregator.files_processed,
            failed: aggregator.files_failed,
            total: aggregator.total,
            elapsed: start_time.elapsed(),
            workers: pool.size(),
        }))
    }

    /// Controlla dipendenze
    fn check_dependencies(&self) -> Result<(), OptimizeError> {
        if self.codec.is_available() {
            return Ok(());
        }

        eprintln!(
            "CRITICAL: PNG codec '{}' is not available, no files were touched",
            self.codec.name()
        );
        Err(OptimizeError::MissingDependency(self.codec.name().to_string()))
    }

    /// Logga configurazione
    fn log_configuration(&self, files: &[PathBuf], pool: &WorkerPool) {
        info!("Found {} PNGs", files.len());
        info!(
            "Optimizing with {} workers (level {}, {} {}, codec {})",
            pool.size(),
            self.config.level,
            self.config.deflate_backend.name(),
            self.config.deflate_level,
            self.codec.name()
        );
        debug!("Filters: {}", self.config.filters.join(","));
    }

    /// Processa i file sul pool e notifica ogni completamento agli osservatori
    async fn process_files_concurrently(
        &self,
        files: Vec<PathBuf>,
        pool: &WorkerPool,
        observers: &mut [&mut dyn CompletionObserver],
    ) -> Result<()> {
        let task_optimizer = Arc::new(TaskOptimizer::new(&self.config, Arc::clone(&self.codec)));
        let mut pending = FuturesUnordered::new();

        for file_path in files {
            let pool = pool.clone();
            let task_optimizer = Arc::clone(&task_optimizer);

            pending.push(tokio::spawn(async move {
                // Il permesso viene rilasciato quando il task finisce
                let _permit = pool.acquire().await?;
                task_optimizer.process_single_file(file_path).await
            }));
        }

        // Ordine di completamento, non di sottomissione.
        // Dopo il primo errore fatale il pool viene chiuso: i task in attesa
        // escono senza toccare file, quelli già nel codec vengono attesi.
        let mut fatal: Option<anyhow::Error> = None;
        while let Some(joined) = pending.next().await {
            let outcome: Result<FileReport> = match joined {
                Ok(result) => result,
                Err(e) => Err(OptimizeError::TaskFailed(e.to_string()).into()),
            };

            match outcome {
                Ok(report) => {
                    for observer in observers.iter_mut() {
                        observer.on_file_done(&report);
                    }
                }
                Err(e) if fatal.is_none() => {
                    error!("Aborting batch: {}", e);
                    pool.close();
                    fatal = Some(e);
                }
                Err(e) => debug!("Task stopped after abort: {}", e),
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
