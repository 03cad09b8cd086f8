// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image cleanup ahead of OCR: grayscale, light speckle removal, then a
// global Otsu threshold so the recognizer sees black text on white.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::median_filter;
use tracing::{debug, instrument};

/// Prepare a rendered page for recognition.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn prepare_for_ocr(image: &DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    let smoothed = median_filter(&gray, 1, 1);
    let threshold = otsu_level(&smoothed);
    debug!(threshold, "Otsu threshold computed");
    DynamicImage::ImageLuma8(binarize(&smoothed, threshold))
}

/// Pixels at or below `threshold` become black, the rest white.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut output = gray.clone();
    for pixel in output.pixels_mut() {
        *pixel = Luma([if pixel.0[0] <= threshold { 0 } else { 255 }]);
    }
    output
}
