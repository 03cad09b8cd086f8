// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust OCR through the `ocrs` engine, with models executed by `rten`.
//
// Only built with the `ocr` feature. The engine needs two model files in one
// directory:
//
// - `text-detection.rten` locates text regions;
// - `text-recognition.rten` decodes characters inside them.
//
// The directory comes from `OcrSettings::resolved_model_dir`.
//
// `ocrs` and `rten` are very slow in debug builds; use release mode.

use std::path::Path;

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use salvage_core::types::FailureReason;
use tracing::{debug, info, instrument};

use super::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

pub struct OcrsRecognizer {
    engine: OcrEngine,
}

impl OcrsRecognizer {
    /// Load both models from `dir`. Missing models are reported as an
    /// unavailable engine so the strategy is skipped rather than faulted.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self, FailureReason> {
        let dir = dir.as_ref();
        let detection = load_model(&dir.join(DETECTION_MODEL_FILENAME))?;
        let recognition = load_model(&dir.join(RECOGNITION_MODEL_FILENAME))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection),
            recognition_model: Some(recognition),
            ..Default::default()
        })
        .map_err(|err| FailureReason::Engine(format!("failed to initialise ocrs: {err}")))?;

        info!("ocrs engine initialised");
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model, FailureReason> {
    if !path.is_file() {
        return Err(FailureReason::Unavailable(format!(
            "OCR model {} is missing; copy {DETECTION_MODEL_FILENAME} and \
             {RECOGNITION_MODEL_FILENAME} into the model directory",
            path.display()
        )));
    }
    Model::load_file(path).map_err(|err| {
        FailureReason::Engine(format!("failed to load model {}: {err}", path.display()))
    })
}

impl TextRecognizer for OcrsRecognizer {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &DynamicImage) -> Result<String, FailureReason> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            FailureReason::Engine(format!("bad image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| FailureReason::Engine(format!("OCR preprocessing failed: {err}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| FailureReason::Engine(format!("OCR recognition failed: {err}")))?;

        debug!(lines = text.lines().count(), "ocrs recognition complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_models_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            OcrsRecognizer::from_model_dir(dir.path()),
            Err(FailureReason::Unavailable(_))
        ));
    }
}
