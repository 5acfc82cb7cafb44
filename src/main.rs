//! # PNG Batch Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Validazione degli input dell'utente
//! - Caricamento della configurazione e avvio dell'optimizer
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, config, level, threads, etc.)
//! 2. Configura il logging (WARN, INFO o DEBUG a seconda dei flag)
//! 3. Con `--init` scrive una configurazione di esempio ed esce
//! 4. Valida che la directory esista
//! 5. Carica la configurazione e applica gli override da CLI
//! 6. Istanzia BatchOptimizer, avvia l'ottimizzazione e stampa il riepilogo
//!
//! ## Exit code:
//! - 0: run completato (anche senza PNG o con alcuni file falliti)
//! - ≠0: directory inesistente, codec non disponibile, worker andato in panic
//!
//! ## Esempio di utilizzo:
//! ```bash
//! png-optimizer ./cards --level 4 --threads 8 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use png_batch_optimizer::{
    codec::default_codec,
    config::DEFAULT_CONFIG_FILE,
    BatchOptimizer, Config, OptimizeError,
};

#[derive(Parser)]
#[command(name = "png-optimizer")]
#[command(about = "Optimize every PNG in a directory, in place")]
struct Args {
    /// Directory containing the .png files
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Path to a custom config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Optimization level (0-6, higher = more compression, slower)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=6))]
    level: Option<u8>,

    /// Number of parallel workers (default: config, then one per CPU)
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Don't show the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Print a line for every file
    #[arg(short, long)]
    verbose: bool,

    /// Write an example png-optimizer.toml in the current directory and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.init {
        Config::write_example(Path::new(DEFAULT_CONFIG_FILE)).await?;
        println!("✓ Generated {} with the default settings", DEFAULT_CONFIG_FILE);
        return Ok(());
    }

    // Validate arguments
    if !args.directory.is_dir() {
        return Err(OptimizeError::Validation(format!(
            "Directory does not exist: {}",
            args.directory.display()
        ))
        .into());
    }

    let config_path = args.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = Config::from_file(&config_path).await;

    if let Some(level) = args.level {
        config = config.with_level(level);
    }
    if let Some(threads) = args.threads {
        config = config.with_workers(threads);
    }
    if args.quiet {
        config.show_progress = false;
    }
    if args.verbose {
        config.verbose = true;
    }

    info!("Starting PNG optimization in: {}", args.directory.display());

    let optimizer = BatchOptimizer::new(config, default_codec());
    if let Some(report) = optimizer.run(&args.directory).await? {
        println!("\n{}", report);
    }

    Ok(())
}
