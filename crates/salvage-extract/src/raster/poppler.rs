// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rendering through Poppler's `pdftoppm`.
//
// Presentations are first converted to PDF with a headless LibreOffice.
// Both the converted PDF and every rendered page are kept in the work
// directory, so repeated requests within a run reuse them.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::bytes::Regex;
use salvage_core::config::RasterSettings;
use salvage_core::types::{DocumentFormat, FailureReason};
use tracing::{debug, info, instrument};

use super::Rasterizer;
use crate::source::SourceDocument;
use crate::tool;

static PAGE_OBJECT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/Type\s*/Page\b").ok());

#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    settings: RasterSettings,
}

impl PopplerRasterizer {
    pub fn new(settings: RasterSettings) -> Self {
        Self { settings }
    }

    /// A PDF on disk carrying the document's pages.
    fn pdf_for(&self, document: &SourceDocument, work_dir: &Path) -> Result<PathBuf, FailureReason> {
        let source = document.materialize(work_dir)?;
        match document.format() {
            DocumentFormat::Pdf => Ok(source),
            DocumentFormat::Pptx => self.convert_presentation(&source, work_dir),
        }
    }

    #[instrument(skip(self, work_dir), fields(source = %source.display()))]
    fn convert_presentation(&self, source: &Path, work_dir: &Path) -> Result<PathBuf, FailureReason> {
        let out_dir = work_dir.join("converted");
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let converted = out_dir.join(format!("{stem}.pdf"));
        if converted.is_file() {
            return Ok(converted);
        }

        std::fs::create_dir_all(&out_dir)?;
        tool::run(
            &self.settings.soffice,
            [
                OsStr::new("--headless"),
                OsStr::new("--convert-to"),
                OsStr::new("pdf"),
                OsStr::new("--outdir"),
                out_dir.as_os_str(),
                source.as_os_str(),
            ],
            None,
        )?;

        if !converted.is_file() {
            return Err(FailureReason::Engine(format!(
                "{} produced no PDF for {}",
                self.settings.soffice,
                source.display()
            )));
        }
        info!(pdf = %converted.display(), "Presentation converted for rendering");
        Ok(converted)
    }
}

impl Rasterizer for PopplerRasterizer {
    fn unit_count(&self, document: &SourceDocument, work_dir: &Path) -> Result<usize, FailureReason> {
        let pdf = self.pdf_for(document, work_dir)?;
        let bytes = std::fs::read(&pdf)?;
        let count = count_pages(&bytes);
        debug!(pages = count, "Renderable pages counted");
        if count == 0 {
            return Err(FailureReason::Structural("no pages to render".into()));
        }
        Ok(count)
    }

    #[instrument(skip(self, document, work_dir), fields(page = index + 1))]
    fn render(
        &self,
        document: &SourceDocument,
        index: usize,
        work_dir: &Path,
    ) -> Result<PathBuf, FailureReason> {
        let pdf = self.pdf_for(document, work_dir)?;
        let pages_dir = work_dir.join("pages");
        let prefix = pages_dir.join(format!("page-{:04}", index + 1));
        let rendered = prefix.with_extension("png");
        if rendered.is_file() {
            return Ok(rendered);
        }

        std::fs::create_dir_all(&pages_dir)?;
        let page = (index + 1).to_string();
        let dpi = self.settings.dpi.to_string();
        tool::run(
            &self.settings.pdftoppm,
            [
                OsStr::new("-f"),
                OsStr::new(&page),
                OsStr::new("-l"),
                OsStr::new(&page),
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                OsStr::new("-singlefile"),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
            None,
        )?;

        if !rendered.is_file() {
            return Err(FailureReason::Engine(format!(
                "{} rendered nothing for page {}",
                self.settings.pdftoppm,
                index + 1
            )));
        }
        Ok(rendered)
    }
}

/// Page count from the page tree, or a raw count of page objects when the
/// tree cannot be loaded.
pub fn count_pages(bytes: &[u8]) -> usize {
    if let Ok(doc) = lopdf::Document::load_mem(bytes) {
        let pages = doc.get_pages().len();
        if pages > 0 {
            return pages;
        }
    }
    PAGE_OBJECT
        .as_ref()
        .map_or(0, |re| re.find_iter(bytes).count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_page_objects_are_counted() {
        let bytes = b"%PDF-1.4\n1 0 obj << /Type /Pages /Kids [] >> endobj\n\
                      2 0 obj << /Type /Page >> endobj\n3 0 obj << /Type/Page >> endobj\n";
        assert_eq!(count_pages(bytes), 2);
    }

    #[test]
    fn missing_renderer_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = PopplerRasterizer::new(RasterSettings {
            pdftoppm: "salvage-missing-pdftoppm".into(),
            ..Default::default()
        });
        let doc = SourceDocument::from_bytes(
            dir.path().join("scan.pdf"),
            DocumentFormat::Pdf,
            b"%PDF-1.4\n2 0 obj << /Type /Page >> endobj\n".to_vec(),
            true,
        );
        assert_eq!(rasterizer.unit_count(&doc, dir.path()), Ok(1));
        assert!(matches!(
            rasterizer.render(&doc, 0, dir.path()),
            Err(FailureReason::Unavailable(_))
        ));
    }
}
