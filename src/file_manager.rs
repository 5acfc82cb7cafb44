//! # File Management Module
//!
//! Questo modulo gestisce le operazioni sui file e la discovery dei PNG.
//!
//! ## Responsabilità:
//! - Discovery non ricorsiva dei file `.png` in una directory
//! - Lettura della dimensione dei file prima/dopo l'ottimizzazione
//! - Formattazione human-readable delle dimensioni
//!
//! ## Discovery:
//! - Solo le entry immediate della directory (niente sottocartelle)
//! - Estensione confrontata case-insensitive (`.png`, `.PNG`)
//! - Ordine stabile per nome, così i log sono ripetibili
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_png_files(Path::new("/path/to/cards"))?;
//! let size = FileManager::file_size(&files[0]).await?;
//! println!("{}", FileManager::format_size(size));
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Get the size of a file in bytes
    pub async fn file_size(path: &Path) -> std::io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Find all PNG files directly inside a directory
    pub fn find_png_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && Self::is_png(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Check if a path has the PNG extension
    pub fn is_png(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("png"))
            .unwrap_or(false)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
