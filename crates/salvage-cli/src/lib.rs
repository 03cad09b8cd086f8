// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared glue for the `recover-text` and `clean-text` binaries: logging
// setup, config assembly from flags, status lines, and text file I/O.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use salvage_core::config::ExtractionConfig;
use salvage_core::error::Result;
use salvage_core::types::{DocumentFormat, ExtractionResult, ExtractionStatus};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Install the stderr `fmt` subscriber. `RUST_LOG` wins when set; otherwise
/// `info`, or `debug` with `--verbose`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOverrides {
    pub threshold: Option<f64>,
    pub jobs: Option<usize>,
    pub work_dir: Option<PathBuf>,
}

/// Load `config_file` (or the defaults), apply `overrides`, and validate the result.
pub fn extraction_config(
    config_file: Option<&Path>,
    overrides: ExtractionOverrides,
) -> Result<ExtractionConfig> {
    let mut config = match config_file {
        Some(path) => {
            debug!(path = %path.display(), "Loading extraction config");
            ExtractionConfig::load(path)?
        }
        None => ExtractionConfig::default(),
    };

    if let Some(threshold) = overrides.threshold {
        config.quality_threshold = threshold;
    }
    if let Some(jobs) = overrides.jobs {
        config.ocr_concurrency = Some(jobs);
    }
    if let Some(dir) = overrides.work_dir {
        config.work_dir = Some(dir);
    }
    config.validate()?;
    Ok(config)
}

/// `deck.pptx` → `deck.txt`.
pub fn recovered_output_path(input: &Path) -> PathBuf {
    input.with_extension("txt")
}

/// `notes.txt` → `notes_cleaned.txt`.
pub fn cleaned_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or(Cow::Borrowed("output"));
    let name = match input.extension() {
        Some(ext) => format!("{stem}_cleaned.{}", ext.to_string_lossy()),
        None => format!("{stem}_cleaned"),
    };
    input.with_file_name(name)
}

/// Human-readable status for a finished recovery, e.g.
/// `Recovered 812 characters from 11 of 12 slides with structural (confidence 0.93) -> deck.txt`.
pub fn recovery_summary(result: &ExtractionResult, format: DocumentFormat, output: &Path) -> String {
    let total = result.units.len();
    let recovered = result.units.iter().filter(|unit| !unit.range.is_empty()).count();
    let unit = format.unit_name();
    let plural = if total == 1 { "" } else { "s" };

    let mut summary = match (result.status, result.accepted_attempt()) {
        (ExtractionStatus::Accepted, Some(attempt)) => format!(
            "Recovered {} characters from {recovered} of {total} {unit}{plural} with {} (confidence {:.2}) -> {}",
            result.text.chars().count(),
            attempt.strategy,
            result.confidence,
            output.display()
        ),
        _ => format!(
            "Recovered low-quality text from {recovered} of {total} {unit}{plural} (confidence {:.2}); review {} before use",
            result.confidence,
            output.display()
        ),
    };
    if result.partial {
        summary.push_str("\nExtraction was interrupted; the text may be incomplete");
    }
    summary
}

/// Read a text file as UTF-8, falling back to Latin-1 so that any byte
/// sequence decodes. A leading byte-order mark is dropped.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(_) => {
            info!(path = %path.display(), "Input is not UTF-8, decoding as Latin-1");
            Ok(bytes.iter().map(|&byte| char::from(byte)).collect())
        }
    }
}

/// Write `text` as UTF-8, creating missing parent directories.
pub fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    info!(path = %path.display(), bytes = text.len(), "Output written");
    Ok(())
}
