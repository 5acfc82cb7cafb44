//! # PNG Codec Module
//!
//! Questo modulo isola il codec PNG esterno dietro un'unica interfaccia.
//! Tutto il lavoro di compressione (ricerca filtri, palette, deflate/zopfli,
//! validazione chunk) è delegato a `oxipng`: qui si fa solo la traduzione
//! della configurazione nei parametri del codec.
//!
//! ## Responsabilità:
//! - `PngCodec`: trait "ottimizza questo PNG in place"
//! - `CodecParams`: parametri risolti dalla `Config` (filtri, backend, strip)
//! - `OxipngCodec`: implementazione reale (feature `oxipng`, attiva di default)
//! - `UnavailableCodec`: sostituto quando il codec non è compilato
//!
//! ## Mappatura configurazione:
//!
//! | Config | Codec |
//! |--------|-------|
//! | `filters` | set ordinato di `RowFilter` (nomi sconosciuti → `none`) |
//! | `deflate_backend` + `deflate_level` | libdeflater 1-12 / zopfli 1-255 iterazioni |
//! | `strip_metadata` | strip dei chunk non essenziali (`Safe`) / nessuno strip |
//! | `optimize_alpha`, `fast_eval` | passati invariati |
//!
//! La modalità "fix errors" è sempre attiva: piccole irregolarità
//! strutturali nel file di input non bloccano l'ottimizzazione.

use crate::config::{Config, DeflateBackend};
use crate::error::OptimizeError;
use std::num::NonZeroU8;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Per-scanline filter the codec may try
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowFilter {
    None,
    Sub,
    Up,
    Average,
    Paeth,
    MinSum,
    Entropy,
    Bigrams,
    BigEnt,
    Brute,
}

impl RowFilter {
    /// Parse a filter name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" => Some(Self::None),
            "sub" => Some(Self::Sub),
            "up" => Some(Self::Up),
            "average" => Some(Self::Average),
            "paeth" => Some(Self::Paeth),
            "minsum" => Some(Self::MinSum),
            "entropy" => Some(Self::Entropy),
            "bigrams" => Some(Self::Bigrams),
            "bigent" => Some(Self::BigEnt),
            "brute" => Some(Self::Brute),
            _ => None,
        }
    }
}

/// Entropy coder with its effort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deflate {
    Libdeflater { compression: u8 },
    Zopfli { iterations: NonZeroU8 },
}

/// Which ancillary chunks to drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripMode {
    None,
    /// Everything that does not affect rendering
    Safe,
}

/// Codec parameters resolved from a `Config`
#[derive(Debug, Clone, PartialEq)]
pub struct CodecParams {
    pub level: u8,
    /// Deduplicated, in configured order
    pub filters: Vec<RowFilter>,
    pub deflate: Deflate,
    pub optimize_alpha: bool,
    pub strip: StripMode,
    pub fast_evaluation: bool,
    pub fix_errors: bool,
}

impl CodecParams {
    pub fn from_config(config: &Config) -> Self {
        let mut filters = Vec::with_capacity(config.filters.len());
        for name in &config.filters {
            let filter = RowFilter::from_name(name).unwrap_or_else(|| {
                warn!("Unknown filter '{}', using 'none'", name);
                RowFilter::None
            });
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }

        let effort = config.deflate_backend.clamp_level(config.deflate_level);
        let deflate = match config.deflate_backend {
            DeflateBackend::Libdeflater => Deflate::Libdeflater { compression: effort },
            DeflateBackend::Zopfli => Deflate::Zopfli {
                iterations: NonZeroU8::new(effort).unwrap_or(NonZeroU8::MIN),
            },
        };

        Self {
            level: config.level,
            filters,
            deflate,
            optimize_alpha: config.optimize_alpha,
            strip: if config.strip_metadata { StripMode::Safe } else { StripMode::None },
            fast_evaluation: config.fast_eval,
            fix_errors: true,
        }
    }
}

/// An in-place PNG optimizer.
///
/// Implementations must leave the file untouched (or at least valid) when they
/// return an error.
pub trait PngCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the codec can actually run in this build
    fn is_available(&self) -> bool {
        true
    }

    /// Re-encode the file at `path` in place
    fn optimize_in_place(&self, path: &Path, params: &CodecParams) -> Result<(), OptimizeError>;
}

/// The codec this build ships with
#[cfg(feature = "oxipng")]
pub fn default_codec() -> Arc<dyn PngCodec> {
    Arc::new(OxipngCodec)
}

/// The codec this build ships with
#[cfg(not(feature = "oxipng"))]
pub fn default_codec() -> Arc<dyn PngCodec> {
    Arc::new(UnavailableCodec)
}

/// Stand-in used when no codec was compiled in
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCodec;

impl PngCodec for UnavailableCodec {
    fn name(&self) -> &str {
        "oxipng"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn optimize_in_place(&self, _path: &Path, _params: &CodecParams) -> Result<(), OptimizeError> {
        Err(OptimizeError::MissingDependency(
            "oxipng (rebuild with the `oxipng` feature)".to_string(),
        ))
    }
}

#[cfg(feature = "oxipng")]
pub use self::oxipng_codec::OxipngCodec;

#[cfg(feature = "oxipng")]
mod oxipng_codec {
    use super::{CodecParams, Deflate, PngCodec, RowFilter, StripMode};
    use crate::error::OptimizeError;
    use indexmap::IndexSet;
    use oxipng::{Deflaters, InFile, Options, OutFile, StripChunks};
    use std::path::Path;

    /// `oxipng` backed codec
    #[derive(Debug, Default, Clone, Copy)]
    pub struct OxipngCodec;

    impl OxipngCodec {
        pub fn options(params: &CodecParams) -> Options {
            let mut opts = Options::from_preset(params.level);

            if !params.filters.is_empty() {
                opts.filter = params.filters.iter().map(|f| to_oxipng_filter(*f)).collect::<IndexSet<_>>();
            }

            opts.deflate = match params.deflate {
                Deflate::Libdeflater { compression } => Deflaters::Libdeflater { compression },
                Deflate::Zopfli { iterations } => Deflaters::Zopfli { iterations },
            };

            opts.strip = match params.strip {
                StripMode::Safe => StripChunks::Safe,
                StripMode::None => StripChunks::None,
            };

            opts.optimize_alpha = params.optimize_alpha;
            opts.fast_evaluation = params.fast_evaluation;
            opts.fix_errors = params.fix_errors;
            opts
        }
    }

    fn to_oxipng_filter(filter: RowFilter) -> oxipng::RowFilter {
        match filter {
            RowFilter::None => oxipng::RowFilter::None,
            RowFilter::Sub => oxipng::RowFilter::Sub,
            RowFilter::Up => oxipng::RowFilter::Up,
            RowFilter::Average => oxipng::RowFilter::Average,
            RowFilter::Paeth => oxipng::RowFilter::Paeth,
            RowFilter::MinSum => oxipng::RowFilter::MinSum,
            RowFilter::Entropy => oxipng::RowFilter::Entropy,
            RowFilter::Bigrams => oxipng::RowFilter::Bigrams,
            RowFilter::BigEnt => oxipng::RowFilter::BigEnt,
            RowFilter::Brute => oxipng::RowFilter::Brute,
        }
    }

    impl PngCodec for OxipngCodec {
        fn name(&self) -> &str {
            "oxipng"
        }

        fn optimize_in_place(&self, path: &Path, params: &CodecParams) -> Result<(), OptimizeError> {
            let input = InFile::Path(path.to_path_buf());
            // No output path: oxipng overwrites the input, and only if the result is smaller
            let output = OutFile::Path {
                path: None,
                preserve_attrs: true,
            };

            oxipng::optimize(&input, &output, &Self::options(params))
                .map_err(|e| OptimizeError::Codec(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_names() {
        assert_eq!(RowFilter::from_name("PAETH"), Some(RowFilter::Paeth));
        assert_eq!(RowFilter::from_name("bigent"), Some(RowFilter::BigEnt));
        assert_eq!(RowFilter::from_name("lanczos"), None);
    }

    #[test]
    fn test_params_from_default_config() {
        let params = CodecParams::from_config(&Config::default());
        assert_eq!(params.level, 6);
        assert_eq!(
            params.filters,
            vec![
                RowFilter::None,
                RowFilter::Sub,
                RowFilter::Up,
                RowFilter::Average,
                RowFilter::Paeth,
                RowFilter::MinSum,
                RowFilter::Bigrams,
            ]
        );
        assert_eq!(params.deflate, Deflate::Libdeflater { compression: 12 });
        assert_eq!(params.strip, StripMode::Safe);
        assert!(params.optimize_alpha);
        assert!(!params.fast_evaluation);
        assert!(params.fix_errors);
    }

    #[test]
    fn test_unknown_filters_become_none() {
        let config = Config {
            filters: vec!["sub".into(), "bogus".into(), "none".into(), "up".into()],
            ..Config::default()
        };
        let params = CodecParams::from_config(&config);
        assert_eq!(params.filters, vec![RowFilter::Sub, RowFilter::None, RowFilter::Up]);
    }

    #[test]
    fn test_zopfli_and_strip_mapping() {
        let config = Config {
            deflate_backend: DeflateBackend::Zopfli,
            deflate_level: 0,
            strip_metadata: false,
            ..Config::default()
        };
        let params = CodecParams::from_config(&config);
        assert_eq!(params.deflate, Deflate::Zopfli { iterations: NonZeroU8::MIN });
        assert_eq!(params.strip, StripMode::None);

        let config = Config {
            deflate_backend: DeflateBackend::Zopfli,
            deflate_level: 15,
            ..Config::default()
        };
        let params = CodecParams::from_config(&config);
        assert_eq!(params.deflate, Deflate::Zopfli { iterations: NonZeroU8::new(15).unwrap() });
    }

    #[test]
    fn test_unavailable_codec() {
        let codec = UnavailableCodec;
        assert!(!codec.is_available());
        let params = CodecParams::from_config(&Config::default());
        assert!(matches!(
            codec.optimize_in_place(Path::new("x.png"), &params),
            Err(OptimizeError::MissingDependency(_))
        ));
    }

    #[cfg(feature = "oxipng")]
    mod real_codec {
        use super::super::*;
        use tempfile::TempDir;

        fn write_test_png(path: &Path) {
            let img = image::RgbaImage::from_fn(64, 64, |x, y| {
                image::Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) % 7) as u8, 255])
            });
            img.save(path).unwrap();
        }

        #[test]
        fn test_options_mapping() {
            let config = Config {
                level: 2,
                filters: vec!["paeth".into(), "brute".into()],
                fast_eval: true,
                optimize_alpha: false,
                ..Config::default()
            };
            let opts = OxipngCodec::options(&CodecParams::from_config(&config));

            let filters: Vec<_> = opts.filter.iter().copied().collect();
            assert_eq!(filters, vec![::oxipng::RowFilter::Paeth, ::oxipng::RowFilter::Brute]);
            assert!(opts.fast_evaluation);
            assert!(!opts.optimize_alpha);
            assert!(opts.fix_errors);
            assert!(matches!(opts.strip, ::oxipng::StripChunks::Safe));
        }

        #[test]
        fn test_optimizes_real_png() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("gradient.png");
            write_test_png(&path);
            let before = std::fs::metadata(&path).unwrap().len();

            let params = CodecParams::from_config(&Config { level: 1, ..Config::default() });
            OxipngCodec.optimize_in_place(&path, &params).unwrap();

            let after = std::fs::metadata(&path).unwrap().len();
            assert!(after <= before);
            let decoded = image::open(&path).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (64, 64));
        }

        #[test]
        fn test_corrupt_input_is_an_error() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("broken.png");
            std::fs::write(&path, b"definitely not a png").unwrap();

            let params = CodecParams::from_config(&Config::default());
            let result = OxipngCodec.optimize_in_place(&path, &params);

            assert!(matches!(result, Err(OptimizeError::Codec(_))));
            assert_eq!(std::fs::read(&path).unwrap(), b"definitely not a png");
        }
    }
}
