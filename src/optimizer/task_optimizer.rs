//! # Task Optimizer Module
//!
//! Worker per l'ottimizzazione di singoli file PNG.
//! Separato dall'orchestratore principale per maggiore modularità.
//!
//! ## Flusso per file:
//! 1. Legge la dimensione originale prima di qualsiasi modifica
//! 2. Invoca il codec in place su un thread bloccante (`spawn_blocking`)
//! 3. Legge la dimensione finale
//! 4. Restituisce un `FileReport`: successo con `Stats` o fallimento con motivo
//!
//! Un file che fallisce non interrompe mai il batch: il fallimento è un
//! valore, non un errore propagato. Solo il panic di un worker diventa `Err`.

use crate::{
    codec::{CodecParams, PngCodec},
    config::Config,
    error::OptimizeError,
    file_manager::FileManager,
    progress::Stats,
};
use anyhow::Result;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Why a single file could not be optimized
#[derive(Debug)]
pub struct FileFailure {
    /// Size measured before the attempt (0 if it could not be read)
    pub before: u64,
    pub error: OptimizeError,
}

/// Result of optimizing one file
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: std::result::Result<Stats, FileFailure>,
}

impl FileReport {
    pub fn optimized(path: PathBuf, stats: Stats) -> Self {
        Self { path, outcome: Ok(stats) }
    }

    pub fn failed(path: PathBuf, before: u64, error: OptimizeError) -> Self {
        Self {
            path,
            outcome: Err(FileFailure { before, error }),
        }
    }

    /// Stats to aggregate: a failure counts as "no change"
    pub fn stats(&self) -> Stats {
        match &self.outcome {
            Ok(stats) => *stats,
            Err(failure) => Stats::unchanged(failure.before),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn file_name(&self) -> Cow<'_, str> {
        self.path.file_name().unwrap_or_default().to_string_lossy()
    }
}

/// Worker per elaborazione singoli file
pub struct TaskOptimizer {
    codec: Arc<dyn PngCodec>,
    params: Arc<CodecParams>,
}

impl TaskOptimizer {
    /// Crea nuovo task optimizer, risolvendo una sola volta i parametri del codec
    pub fn new(config: &Config, codec: Arc<dyn PngCodec>) -> Self {
        Self {
            codec,
            params: Arc::new(CodecParams::from_config(config)),
        }
    }

    /// Processa un singolo file.
    ///
    /// Returns `Err` only when the worker thread itself died.
    pub async fn process_single_file(&self, file_path: PathBuf) -> Result<FileReport> {
        let before = match FileManager::file_size(&file_path).await {
            Ok(size) => size,
            Err(e) => return Ok(FileReport::failed(file_path, 0, e.into())),
        };

        let codec = Arc::clone(&self.codec);
        let params = Arc::clone(&self.params);
        let job_path = file_path.clone();
        let codec_result = tokio::task::spawn_blocking(move || codec.optimize_in_place(&job_path, &params))
            .await
            .map_err(|e| OptimizeError::TaskFailed(format!("{}: {}", file_path.display(), e)))?;

        if let Err(e) = codec_result {
            debug!("Codec rejected {}: {}", file_path.display(), e);
            return Ok(FileReport::failed(file_path, before, e));
        }

        Ok(Self::measure_after(file_path, before).await)
    }

    /// Gestisce la misura finale dopo un'ottimizzazione riuscita
    async fn measure_after(file_path: PathBuf, before: u64) -> FileReport {
        match FileManager::file_size(&file_path).await {
            Ok(after) => {
                debug!("{}: {} -> {} bytes", file_path.display(), before, after);
                FileReport::optimized(file_path, Stats::new(before, after))
            }
            Err(e) => FileReport::failed(file_path, before, e.into()),
        }
    }
}
