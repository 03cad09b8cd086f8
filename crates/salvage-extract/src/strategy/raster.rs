// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterize and recognize — the last resort. Each page or slide is rendered
// to an image, cleaned up, and passed through OCR. This is the only adapter
// that works unit by unit, so the orchestrator can spread units across
// workers and time them out individually.

use std::sync::{Arc, OnceLock};

use salvage_core::config::{ExtractionConfig, OcrEngineKind, OcrSettings};
use salvage_core::types::{FailureReason, StrategyKind, UnitOutcome};
use tracing::{debug, instrument, warn};

use super::{AdapterContext, StrategyAdapter, require_text};
use crate::raster::preprocess::prepare_for_ocr;
use crate::raster::{PopplerRasterizer, Rasterizer, TesseractRecognizer, TextRecognizer};
use crate::source::SourceDocument;

type SharedRecognizer = Arc<dyn TextRecognizer>;

pub struct RasterRecognizeAdapter {
    rasterizer: Arc<dyn Rasterizer>,
    settings: OcrSettings,
    /// Built on first use; model loading is expensive and often unneeded.
    recognizer: OnceLock<Result<SharedRecognizer, FailureReason>>,
}

impl RasterRecognizeAdapter {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, recognizer: SharedRecognizer) -> Self {
        Self {
            rasterizer,
            settings: OcrSettings::default(),
            recognizer: OnceLock::from(Ok(recognizer)),
        }
    }

    /// Poppler rendering plus the OCR engine selected in `config`.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            rasterizer: Arc::new(PopplerRasterizer::new(config.raster.clone())),
            settings: config.ocr.clone(),
            recognizer: OnceLock::new(),
        }
    }

    fn recognizer(&self) -> Result<&dyn TextRecognizer, FailureReason> {
        match self.recognizer.get_or_init(|| build_recognizer(&self.settings)) {
            Ok(recognizer) => Ok(recognizer.as_ref()),
            Err(reason) => Err(reason.clone()),
        }
    }
}

fn build_recognizer(settings: &OcrSettings) -> Result<SharedRecognizer, FailureReason> {
    match settings.engine {
        OcrEngineKind::Tesseract => Ok(Arc::new(TesseractRecognizer::from_settings(settings))),
        #[cfg(feature = "ocr")]
        OcrEngineKind::Ocrs => {
            let dir = settings.resolved_model_dir().ok_or_else(|| {
                FailureReason::Unavailable(format!(
                    "no OCR model directory; set ocr.model_dir or {}",
                    salvage_core::config::OCR_MODELS_ENV
                ))
            })?;
            Ok(Arc::new(crate::raster::ocrs_engine::OcrsRecognizer::from_model_dir(dir)?))
        }
        #[cfg(not(feature = "ocr"))]
        OcrEngineKind::Ocrs => Err(FailureReason::Unavailable(
            "ocrs engine requested but this build lacks the `ocr` feature".into(),
        )),
    }
}

impl StrategyAdapter for RasterRecognizeAdapter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RasterRecognize
    }

    #[instrument(skip_all, fields(format = %document.format()))]
    fn extract(
        &self,
        document: &SourceDocument,
        ctx: &AdapterContext,
    ) -> Result<Vec<UnitOutcome>, FailureReason> {
        let count = self.rasterizer.unit_count(document, &ctx.work_dir)?;
        let units = (0..count)
            .map(|index| match self.extract_unit(document, index, ctx) {
                Ok(text) => UnitOutcome::recovered(index, text),
                Err(reason) => UnitOutcome::failed(index, reason),
            })
            .collect();
        require_text(units)
    }

    fn unit_plan(
        &self,
        document: &SourceDocument,
        ctx: &AdapterContext,
    ) -> Option<Result<usize, FailureReason>> {
        Some(
            self.recognizer()
                .and_then(|_| self.rasterizer.unit_count(document, &ctx.work_dir)),
        )
    }

    #[instrument(skip(self, document, ctx))]
    fn extract_unit(
        &self,
        document: &SourceDocument,
        index: usize,
        ctx: &AdapterContext,
    ) -> Result<String, FailureReason> {
        let recognizer = self.recognizer()?;
        let path = self.rasterizer.render(document, index, &ctx.work_dir)?;
        let page = image::open(&path).map_err(|err| {
            warn!(path = %path.display(), error = %err, "Rendered page unreadable");
            FailureReason::Engine(format!("cannot decode rendered page: {err}"))
        })?;

        let text = recognizer.recognize(&prepare_for_ocr(&page))?;
        debug!(engine = recognizer.name(), chars = text.len(), "Unit recognised");
        Ok(text)
    }
}
