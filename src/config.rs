//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di ottimizzazione
//! - Carica la configurazione da file TOML in modo tollerante (chiave per chiave)
//! - Fornisce valori di default sensati per tutti i parametri
//! - Genera un file di configurazione di esempio (`--init`)
//!
//! ## Formato file (`png-optimizer.toml`):
//! ```toml
//! [compression]
//! level = 6
//! strip_metadata = true
//! optimize_alpha = true
//! fast_eval = false
//! max_workers = "auto"
//!
//! [advanced]
//! deflate_method = "libdeflater"
//! deflate_level = 12
//! custom_filters = "none,sub,up,average,paeth,minsum,bigrams"
//!
//! [output]
//! show_progress = true
//! verbose = false
//! ```
//!
//! ## Tolleranza agli errori:
//! - File mancante: default silenziosi
//! - Chiavi sconosciute: ignorate
//! - Valori malformati o fuori range: warning e default per quella chiave
//! - File non TOML valido: warning e lettura riga per riga `chiave = valore`,
//!   si perdono solo le voci illeggibili
//!
//! La configurazione caricata è immutabile: viene condivisa in sola lettura
//! da tutti i worker.

use crate::error::OptimizeError;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::path::Path;
use toml::{Table, Value};
use tracing::{debug, info, warn};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "png-optimizer.toml";

/// Row filters tried when the configuration does not name any
pub const DEFAULT_FILTERS: [&str; 7] = ["none", "sub", "up", "average", "paeth", "minsum", "bigrams"];

const LEVEL_RANGE: RangeInclusive<u8> = 0..=6;

/// Worker pool size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCount {
    /// One worker per logical CPU
    Auto,
    Fixed(NonZeroUsize),
}

impl WorkerCount {
    /// Parse `"auto"` or a positive integer
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        value.parse::<usize>().ok().and_then(NonZeroUsize::new).map(Self::Fixed)
    }

    /// Resolve to a concrete pool size (always at least 1)
    pub fn resolve(&self) -> usize {
        match self {
            Self::Auto => num_cpus::get().max(1),
            Self::Fixed(n) => n.get(),
        }
    }
}

impl std::fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(n) => write!(f, "{}", n),
        }
    }
}

/// Entropy coding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeflateBackend {
    /// libdeflater: fast and deterministic, effort 1-12
    Libdeflater,
    /// zopfli: slow and exhaustive, effort is the iteration count 1-255
    Zopfli,
}

impl DeflateBackend {
    /// `zopfli`/`exhaustive` pick zopfli, any other name falls back to libdeflater
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "zopfli" | "exhaustive" => Self::Zopfli,
            "libdeflater" | "libdeflate" | "fast" => Self::Libdeflater,
            other => {
                debug!("Unknown deflate method '{}', using libdeflater", other);
                Self::Libdeflater
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Libdeflater => "libdeflater",
            Self::Zopfli => "zopfli",
        }
    }

    /// Effort scale accepted by the backend
    pub fn level_range(&self) -> RangeInclusive<u8> {
        match self {
            Self::Libdeflater => 1..=12,
            Self::Zopfli => 1..=255,
        }
    }

    /// Clamp a configured effort into the backend's scale
    pub fn clamp_level(&self, level: u8) -> u8 {
        let range = self.level_range();
        level.clamp(*range.start(), *range.end())
    }
}

/// Configuration for PNG optimization
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Codec effort preset (0-6)
    pub level: u8,
    /// Strip non-essential chunks
    pub strip_metadata: bool,
    /// Allow altering the color of fully transparent pixels
    pub optimize_alpha: bool,
    /// Faster but less thorough filter evaluation
    pub fast_eval: bool,
    /// Number of parallel workers
    pub max_workers: WorkerCount,
    /// Entropy coder
    pub deflate_backend: DeflateBackend,
    /// Backend specific effort (compression level or zopfli iterations)
    pub deflate_level: u8,
    /// Candidate row filters, lowercase, in trial order
    pub filters: Vec<String>,
    /// Render a live progress bar
    pub show_progress: bool,
    /// Log every file's outcome
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: 6,
            strip_metadata: true,
            optimize_alpha: true,
            fast_eval: false,
            max_workers: WorkerCount::Auto,
            deflate_backend: DeflateBackend::Libdeflater,
            deflate_level: 12,
            filters: DEFAULT_FILTERS.iter().map(|f| f.to_string()).collect(),
            show_progress: true,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from file.
    ///
    /// Never fails: a missing file yields the defaults, an unreadable or
    /// partially invalid one yields the defaults for every key it could not use.
    pub async fn from_file(path: &Path) -> Self {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let config = Self::from_toml_str(&content);
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Couldn't read config file {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse configuration text, keeping the default for anything unusable
    pub fn from_toml_str(content: &str) -> Self {
        let mut config = Self::default();

        match content.parse::<Table>() {
            Ok(table) => config.apply_table(&table),
            Err(e) => {
                warn!("Config is not valid TOML ({}), reading it line by line", e.message());
                config.apply_table(&scan_lines(content));
            }
        }

        config
    }

    fn apply_table(&mut self, table: &Table) {
        if let Some(section) = get_section(table, "compression") {
            self.level = read_key(section, "level", self.level, |v| as_u8_in(v, LEVEL_RANGE));
            self.strip_metadata = read_key(section, "strip_metadata", self.strip_metadata, as_bool);
            self.optimize_alpha = read_key(section, "optimize_alpha", self.optimize_alpha, as_bool);
            self.fast_eval = read_key(section, "fast_eval", self.fast_eval, as_bool);
            self.max_workers = read_key(section, "max_workers", self.max_workers, as_worker_count);
        }

        if let Some(section) = get_section(table, "advanced") {
            self.deflate_backend = read_key(section, "deflate_method", self.deflate_backend, |v| {
                v.as_str().map(DeflateBackend::from_name)
            });
            self.deflate_level = read_key(section, "deflate_level", self.deflate_level, |v| as_u8_in(v, 0..=u8::MAX));
            if let Some(filters) = section.get("custom_filters").and_then(as_filter_list) {
                if !filters.is_empty() {
                    self.filters = filters;
                }
            }
        }

        if let Some(section) = get_section(table, "output") {
            self.show_progress = read_key(section, "show_progress", self.show_progress, as_bool);
            self.verbose = read_key(section, "verbose", self.verbose, as_bool);
        }
    }

    /// Override the effort preset (CLI `--level`)
    pub fn with_level(mut self, level: u8) -> Self {
        if LEVEL_RANGE.contains(&level) {
            self.level = level;
        } else {
            warn!("Ignoring level {} (must be 0-6)", level);
        }
        self
    }

    /// Override the worker count (CLI `--threads`)
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.max_workers = WorkerCount::Fixed(workers);
        self
    }

    /// Render this configuration as a commented TOML file
    pub fn to_example_toml(&self) -> Result<String, OptimizeError> {
        let body = toml::to_string_pretty(&ConfigFile::from(self))
            .map_err(|e| OptimizeError::Config(e.to_string()))?;

        Ok(format!(
            "# PNG optimizer configuration\n\
             # Every key is optional, missing or invalid values fall back to these defaults.\n\
             # deflate_method: \"libdeflater\" (levels 1-12) or \"zopfli\" (iterations 1-255, ~10 is plenty)\n\n{}",
            body
        ))
    }

    /// Write the default configuration to `path`, refusing to overwrite
    pub async fn write_example(path: &Path) -> Result<(), OptimizeError> {
        if path.exists() {
            return Err(OptimizeError::Config(format!("{} already exists", path.display())));
        }

        let content = Self::default().to_example_toml()?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Best-effort `[section]` / `key = value` reader for files TOML rejects.
///
/// Values that are valid TOML keep their type, anything else (`auto`,
/// `sub,up`) is taken as a bare string. Lines that fit neither shape are skipped.
fn scan_lines(content: &str) -> Table {
    let mut table = Table::new();
    let mut current: Option<String> = None;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            current = line
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty());
            if current.is_none() {
                warn!("Config line {}: bad section header, skipping until the next one", lineno + 1);
            }
            continue;
        }

        let Some(section) = current.as_ref() else {
            continue;
        };
        let Some((key, value)) = line.split_once('=') else {
            warn!("Config line {}: expected 'key = value'", lineno + 1);
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let entry = table
            .entry(section.clone())
            .or_insert_with(|| Value::Table(Table::new()));
        if let Value::Table(entries) = entry {
            entries.insert(key.to_string(), scan_value(value.trim()));
        }
    }

    table
}

fn scan_value(raw: &str) -> Value {
    format!("v = {}", raw)
        .parse::<Table>()
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| Value::String(raw.trim_matches(|c| c == '"' || c == '\'').to_string()))
}

fn get_section<'a>(table: &'a Table, name: &str) -> Option<&'a Table> {
    match table.get(name) {
        Some(Value::Table(section)) => Some(section),
        Some(_) => {
            warn!("Config entry [{}] is not a section, ignoring it", name);
            None
        }
        None => None,
    }
}

/// Read one key, keeping `current` when the key is absent or malformed
fn read_key<T>(section: &Table, key: &str, current: T, parse: impl Fn(&Value) -> Option<T>) -> T {
    match section.get(key) {
        None => current,
        Some(value) => parse(value).unwrap_or_else(|| {
            warn!("Invalid value for '{}': {}, keeping default", key, value);
            current
        }),
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(1) => Some(true),
        Value::Integer(0) => Some(false),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_u8_in(value: &Value, range: RangeInclusive<u8>) -> Option<u8> {
    let parsed = match value {
        Value::Integer(i) => u8::try_from(*i).ok(),
        Value::String(s) => s.trim().parse::<u8>().ok(),
        _ => None,
    };
    parsed.filter(|v| range.contains(v))
}

fn as_worker_count(value: &Value) -> Option<WorkerCount> {
    match value {
        Value::String(s) => WorkerCount::parse(s),
        Value::Integer(i) => usize::try_from(*i)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(WorkerCount::Fixed),
        _ => None,
    }
}

/// Comma separated string (or array of strings) into lowercase names
fn as_filter_list(value: &Value) -> Option<Vec<String>> {
    let names: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => {
            warn!("Invalid value for 'custom_filters': {}, keeping default", value);
            return None;
        }
    };

    Some(
        names
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect(),
    )
}

/// On-disk layout, used to render the example file
#[derive(Serialize)]
struct ConfigFile {
    compression: CompressionSection,
    advanced: AdvancedSection,
    output: OutputSection,
}

#[derive(Serialize)]
struct CompressionSection {
    level: u8,
    strip_metadata: bool,
    optimize_alpha: bool,
    fast_eval: bool,
    max_workers: String,
}

#[derive(Serialize)]
struct AdvancedSection {
    deflate_method: &'static str,
    deflate_level: u8,
    custom_filters: String,
}

#[derive(Serialize)]
struct OutputSection {
    show_progress: bool,
    verbose: bool,
}

impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        Self {
            compression: CompressionSection {
                level: config.level,
                strip_metadata: config.strip_metadata,
                optimize_alpha: config.optimize_alpha,
                fast_eval: config.fast_eval,
                max_workers: config.max_workers.to_string(),
            },
            advanced: AdvancedSection {
                deflate_method: config.deflate_backend.name(),
                deflate_level: config.deflate_level,
                custom_filters: config.filters.join(","),
            },
            output: OutputSection {
                show_progress: config.show_progress,
                verbose: config.verbose,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.level, 6);
        assert!(config.strip_metadata);
        assert!(config.optimize_alpha);
        assert!(!config.fast_eval);
        assert_eq!(config.max_workers, WorkerCount::Auto);
        assert_eq!(config.deflate_backend, DeflateBackend::Libdeflater);
        assert_eq!(config.deflate_level, 12);
        assert_eq!(config.filters, DEFAULT_FILTERS.to_vec());
        assert!(config.show_progress);
        assert!(!config.verbose);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("nope.toml")).await;
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_only_level_overridden() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(&path, "[compression]\nlevel = 3\n").await.unwrap();

        let config = Config::from_file(&path).await;
        assert_eq!(config, Config { level: 3, ..Config::default() });
    }

    #[test]
    fn test_all_keys() {
        let config = Config::from_toml_str(
            r#"
            [compression]
            level = 2
            strip_metadata = false
            optimize_alpha = "no"
            fast_eval = true
            max_workers = 3

            [advanced]
            deflate_method = "Zopfli"
            deflate_level = 15
            custom_filters = "paeth, minsum"

            [output]
            show_progress = false
            verbose = "yes"
            "#,
        );

        assert_eq!(config.level, 2);
        assert!(!config.strip_metadata);
        assert!(!config.optimize_alpha);
        assert!(config.fast_eval);
        assert_eq!(config.max_workers, WorkerCount::Fixed(NonZeroUsize::new(3).unwrap()));
        assert_eq!(config.deflate_backend, DeflateBackend::Zopfli);
        assert_eq!(config.deflate_level, 15);
        assert_eq!(config.filters, vec!["paeth", "minsum"]);
        assert!(!config.show_progress);
        assert!(config.verbose);
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let config = Config::from_toml_str(
            r#"
            [compression]
            level = 42
            strip_metadata = "maybe"
            max_workers = "lots"
            fast_eval = true
            unknown_key = 1

            [advanced]
            deflate_level = -4
            "#,
        );

        assert_eq!(config, Config { fast_eval: true, ..Config::default() });
    }

    #[test]
    fn test_not_toml_gives_defaults() {
        let config = Config::from_toml_str("[compression\nlevel == ");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_bare_values_keep_the_rest_of_the_file() {
        let config = Config::from_toml_str(
            "[compression]\nlevel = 3\nmax_workers = 4\nstrip_metadata = off\n\n\
             [advanced]\ncustom_filters = sub,up\ndeflate_method = zopfli\n",
        );

        assert_eq!(config.level, 3);
        assert_eq!(config.max_workers, WorkerCount::Fixed(NonZeroUsize::new(4).unwrap()));
        assert!(!config.strip_metadata);
        assert_eq!(config.filters, vec!["sub", "up"]);
        assert_eq!(config.deflate_backend, DeflateBackend::Zopfli);
        assert!(config.optimize_alpha);
    }

    #[test]
    fn test_unparseable_line_only_loses_that_key() {
        let config = Config::from_toml_str(
            "; comment\n[compression]\nlevel = 3\nmax_workers = auto\nthis line is junk\nlevel_x\n\
             fast_eval = true\n[output]\nverbose = 1\n",
        );

        assert_eq!(
            config,
            Config {
                level: 3,
                fast_eval: true,
                verbose: true,
                ..Config::default()
            }
        );
    }

    #[test]
    fn test_empty_filter_list_keeps_defaults() {
        let config = Config::from_toml_str("[advanced]\ncustom_filters = \"\"\n");
        assert_eq!(config.filters.len(), 7);
        assert_eq!(config.filters, DEFAULT_FILTERS.to_vec());

        let config = Config::from_toml_str("[advanced]\ncustom_filters = \" , ,\"\n");
        assert_eq!(config.filters, DEFAULT_FILTERS.to_vec());
    }

    #[test]
    fn test_filter_list_order_and_case() {
        let config = Config::from_toml_str("[advanced]\ncustom_filters = \"SUB,Up\"\n");
        assert_eq!(config.filters, vec!["sub", "up"]);

        let config = Config::from_toml_str("[advanced]\ncustom_filters = [\"Brute\", \"none\"]\n");
        assert_eq!(config.filters, vec!["brute", "none"]);
    }

    #[test]
    fn test_worker_count_parse() {
        assert_eq!(WorkerCount::parse("auto"), Some(WorkerCount::Auto));
        assert_eq!(WorkerCount::parse(" AUTO "), Some(WorkerCount::Auto));
        assert_eq!(
            WorkerCount::parse("8"),
            Some(WorkerCount::Fixed(NonZeroUsize::new(8).unwrap()))
        );
        assert_eq!(WorkerCount::parse("0"), None);
        assert_eq!(WorkerCount::parse("-1"), None);
        assert!(WorkerCount::Auto.resolve() >= 1);
    }

    #[test]
    fn test_deflate_backend_clamp() {
        assert_eq!(DeflateBackend::Libdeflater.clamp_level(200), 12);
        assert_eq!(DeflateBackend::Libdeflater.clamp_level(0), 1);
        assert_eq!(DeflateBackend::Zopfli.clamp_level(200), 200);
        assert_eq!(DeflateBackend::Zopfli.clamp_level(0), 1);
        assert_eq!(DeflateBackend::from_name("whatever"), DeflateBackend::Libdeflater);
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_level(2)
            .with_level(9)
            .with_workers(NonZeroUsize::new(5).unwrap());
        assert_eq!(config.level, 2);
        assert_eq!(config.max_workers.resolve(), 5);
    }

    #[tokio::test]
    async fn test_example_file_loads_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE);

        Config::write_example(&path).await.unwrap();
        assert_eq!(Config::from_file(&path).await, Config::default());

        // Refuses to overwrite
        assert!(matches!(
            Config::write_example(&path).await,
            Err(OptimizeError::Config(_))
        ));
    }
}
