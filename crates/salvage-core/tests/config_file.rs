// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config files as a user would write them, and how their errors read.

use salvage_core::config::{ExtractionConfig, OcrEngineKind};
use salvage_core::diagnostics::describe;
use salvage_core::SalvageError;

fn write(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("salvage.json");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn partial_file_keeps_defaults_for_the_rest() {
    let (_dir, path) = write(r#"{ "unit_timeout_secs": 5, "ocr": { "engine": "ocrs" } }"#);
    let config = ExtractionConfig::load(&path).unwrap();

    assert_eq!(config.unit_timeout().as_secs(), 5);
    assert_eq!(config.ocr.engine, OcrEngineKind::Ocrs);
    assert_eq!(config.ocr.language, "eng");
    assert_eq!(config.quality_threshold, ExtractionConfig::default().quality_threshold);
}

#[test]
fn out_of_range_threshold_is_a_config_error() {
    let (_dir, path) = write(r#"{ "quality_threshold": 1.2 }"#);
    let err = ExtractionConfig::load(&path).unwrap_err();
    assert!(matches!(err, SalvageError::Config(_)));
    assert!(describe(&err).message.contains("quality_threshold"));
}

#[test]
fn malformed_json_is_a_serialization_error() {
    let (_dir, path) = write("{ not json");
    let err = ExtractionConfig::load(&path).unwrap_err();
    assert!(matches!(err, SalvageError::Serialization(_)));
    assert!(describe(&err).suggestion.contains("config file syntax"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ExtractionConfig::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SalvageError::Io(_)));
    assert!(describe(&err).message.contains("could not be found"));
}
