// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterize-and-recognize collaborators: page rendering, image cleanup for
// OCR, and the OCR engines themselves.

#[cfg(feature = "ocr")]
pub mod ocrs_engine;
pub mod poppler;
pub mod preprocess;
pub mod tesseract;

use std::path::{Path, PathBuf};

use image::DynamicImage;
use salvage_core::types::FailureReason;

use crate::source::SourceDocument;

pub use poppler::PopplerRasterizer;
pub use tesseract::TesseractRecognizer;

/// Renders document units (pages or slides) to images.
pub trait Rasterizer: Send + Sync {
    /// Number of renderable units. May prepare (and cache) intermediate
    /// files in `work_dir`.
    fn unit_count(&self, document: &SourceDocument, work_dir: &Path)
    -> Result<usize, FailureReason>;

    /// Render the zero-based unit `index`, returning the image file path.
    fn render(
        &self,
        document: &SourceDocument,
        index: usize,
        work_dir: &Path,
    ) -> Result<PathBuf, FailureReason>;
}

/// Turns a rendered unit into text.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &DynamicImage) -> Result<String, FailureReason>;
}
