// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SalvageError};

/// Quality threshold an attempt must reach to be accepted outright.
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.6;

/// Environment variable naming the `ocrs` model directory; wins over `ocr.model_dir`.
pub const OCR_MODELS_ENV: &str = "SALVAGE_OCR_MODELS";

/// Settings for the extraction stage.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum quality score for an attempt to be accepted (0.0–1.0).
    pub quality_threshold: f64,
    /// Weights used by the quality scorer.
    pub weights: ScoringWeights,
    /// Upper bound on a single whole-document strategy invocation.
    pub strategy_timeout_secs: u64,
    /// Upper bound on recognising a single page or slide.
    pub unit_timeout_secs: u64,
    /// Maximum concurrent OCR units (`None` = available parallelism).
    pub ocr_concurrency: Option<usize>,
    /// Scratch directory for rasterised pages and converted copies.
    pub work_dir: Option<PathBuf>,
    /// External document conversion service.
    pub service: ServiceCommand,
    pub raster: RasterSettings,
    pub ocr: OcrSettings,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            weights: ScoringWeights::default(),
            strategy_timeout_secs: 120,
            unit_timeout_secs: 60,
            ocr_concurrency: None,
            work_dir: None,
            service: ServiceCommand::default(),
            raster: RasterSettings::default(),
            ocr: OcrSettings::default(),
        }
    }
}

impl ExtractionConfig {
    /// Load a JSON config file, filling unspecified keys with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(SalvageError::Config(format!(
                "quality_threshold must be within 0.0..=1.0, got {}",
                self.quality_threshold
            )));
        }
        if self.ocr_concurrency == Some(0) {
            return Err(SalvageError::Config(
                "ocr_concurrency must be at least 1".into(),
            ));
        }
        if self.strategy_timeout_secs == 0 || self.unit_timeout_secs == 0 {
            return Err(SalvageError::Config("timeouts must be non-zero".into()));
        }
        self.weights.validate()
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }

    pub fn unit_timeout(&self) -> Duration {
        Duration::from_secs(self.unit_timeout_secs)
    }

    /// Effective OCR concurrency limit.
    pub fn concurrency_limit(&self) -> usize {
        self.ocr_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Weights for combining the quality scorer's heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of the printable-character ratio.
    pub printable: f64,
    /// Weight of the word-like token ratio.
    pub words: f64,
    /// Share of single-character tokens tolerated before the penalty applies.
    pub noise_tolerance: f64,
    /// Penalty per unit of single-character ratio above the tolerance.
    pub noise_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            printable: 0.4,
            words: 0.6,
            noise_tolerance: 0.15,
            noise_penalty: 1.0,
        }
    }
}

impl ScoringWeights {
    fn validate(&self) -> Result<()> {
        let values = [
            self.printable,
            self.words,
            self.noise_tolerance,
            self.noise_penalty,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(SalvageError::Config(
                "scoring weights must be finite and non-negative".into(),
            ));
        }
        if self.printable + self.words <= 0.0 {
            return Err(SalvageError::Config(
                "printable and word weights cannot both be zero".into(),
            ));
        }
        Ok(())
    }
}

/// An external document conversion service invoked as a process.
///
/// The input path is appended after `args`; plain text is read from stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ServiceCommand {
    /// Apache Tika's command-line app in plain text mode.
    fn default() -> Self {
        Self {
            program: "tika".into(),
            args: vec!["--text".into()],
        }
    }
}

/// Page rendering settings for the rasterize-and-recognize fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    pub dpi: u32,
    /// Poppler's page renderer.
    pub pdftoppm: String,
    /// LibreOffice, used to turn presentations into PDF before rendering.
    pub soffice: String,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            dpi: 300,
            pdftoppm: "pdftoppm".into(),
            soffice: "soffice".into(),
        }
    }
}

/// Which OCR engine recognises rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// The `tesseract` command-line engine.
    Tesseract,
    /// The pure-Rust `ocrs` engine (requires the `ocr` feature).
    Ocrs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub engine: OcrEngineKind,
    pub tesseract: String,
    /// Tesseract language code.
    pub language: String,
    /// Directory holding the `ocrs` detection/recognition models.
    pub model_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Tesseract,
            tesseract: "tesseract".into(),
            language: "eng".into(),
            model_dir: None,
        }
    }
}

impl OcrSettings {
    /// Where the `ocrs` models live: `$SALVAGE_OCR_MODELS`, then
    /// `ocr.model_dir`, then `salvage/models` in the user's data directory.
    pub fn resolved_model_dir(&self) -> Option<PathBuf> {
        self.model_dir_from(|key| std::env::var_os(key))
    }

    fn model_dir_from(&self, var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
        let path_var = |key: &str| var(key).filter(|value| !value.is_empty()).map(PathBuf::from);
        path_var(OCR_MODELS_ENV)
            .or_else(|| self.model_dir.clone())
            .or_else(|| path_var("XDG_DATA_HOME").map(|data| data.join("salvage").join("models")))
            .or_else(|| {
                path_var("HOME").map(|home| home.join(".local/share").join("salvage").join("models"))
            })
    }
}
