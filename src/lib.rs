//! # PNG Batch Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Caricamento tollerante della configurazione TOML
//! - `error`: Tipi di errore custom
//! - `file_manager`: Discovery dei PNG e dimensioni file
//! - `progress`: Statistiche (before/after) e progress bar
//! - `codec`: Interfaccia verso il codec PNG esterno (`oxipng`)
//! - `optimizer`: Orchestratore batch, worker per singolo file, osservatori
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use png_batch_optimizer::{codec::default_codec, BatchOptimizer, Config};
//!
//! let config = Config::from_file(Path::new("png-optimizer.toml")).await;
//! let optimizer = BatchOptimizer::new(config, default_codec());
//! if let Some(report) = optimizer.run(&path).await? {
//!     println!("{report}");
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod optimizer;
pub mod progress;

pub use codec::{CodecParams, PngCodec};
pub use config::Config;
pub use error::OptimizeError;
pub use optimizer::{BatchOptimizer, BatchReport};
pub use progress::Stats;
