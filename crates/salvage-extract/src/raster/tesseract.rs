// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use salvage_core::config::OcrSettings;
use salvage_core::types::FailureReason;
use tracing::{debug, instrument};

use super::TextRecognizer;
use crate::tool;

/// OCR through the `tesseract` command-line engine.
///
/// The page is piped in as PNG and text is read from stdout, so nothing is
/// written to disk.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: String,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self::new(settings.tesseract.clone(), settings.language.clone())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height(), lang = %self.language))]
    fn recognize(&self, image: &DynamicImage) -> Result<String, FailureReason> {
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|err| FailureReason::Engine(format!("cannot encode page image: {err}")))?;

        let stdout = tool::run(
            &self.program,
            ["stdin", "stdout", "-l", self.language.as_str()],
            Some(png.get_ref().as_slice()),
        )?;
        let text = String::from_utf8_lossy(&stdout).into_owned();
        debug!(chars = text.len(), "Tesseract recognition complete");
        Ok(text)
    }
}
