//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Codec`: Il codec PNG ha rifiutato o non è riuscito a ottimizzare il file
//! - `MissingDependency`: Codec PNG non disponibile in questa build
//! - `Config`: File di configurazione illeggibile o non scrivibile
//! - `Validation`: Errori di validazione input (directory inesistente, etc.)
//! - `TaskFailed`: Un worker è terminato in modo anomalo (panic)
//!
//! ## Nota:
//! Gli errori per singolo file non interrompono mai il batch: vengono
//! trasportati come valori in `FileReport` e decide il chiamante se loggarli.
//! Solo `MissingDependency`, `Validation` e `TaskFailed` arrivano al `main`.

/// Custom error types for PNG batch optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG codec error: {0}")]
    Codec(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Worker task failed: {0}")]
    TaskFailed(String),
}
