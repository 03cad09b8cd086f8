// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structural parse — reads the container the way it was meant to be read.
//
// Presentations: the slide parts `ppt/slides/slideN.xml` are opened from the
// zip archive in numeric order and the text of every `<a:t>` run is kept,
// with a line break at each paragraph end.
//
// PDFs: lopdf loads the object graph and text is extracted page by page.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use salvage_core::types::{DocumentFormat, FailureReason, StrategyKind, UnitOutcome};
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

use super::{AdapterContext, StrategyAdapter, require_text};
use crate::source::SourceDocument;

const SLIDE_PREFIX: &str = "ppt/slides/slide";
const SLIDE_SUFFIX: &str = ".xml";

#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralParseAdapter;

impl StrategyAdapter for StructuralParseAdapter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StructuralParse
    }

    #[instrument(skip_all, fields(format = %document.format(), repaired = document.is_repaired()))]
    fn extract(
        &self,
        document: &SourceDocument,
        _ctx: &AdapterContext,
    ) -> Result<Vec<UnitOutcome>, FailureReason> {
        let bytes = document.bytes()?;
        let units = match document.format() {
            DocumentFormat::Pptx => read_presentation(bytes)?,
            DocumentFormat::Pdf => read_pdf(bytes)?,
        };
        info!(units = units.len(), "Structural parse complete");
        require_text(units)
    }
}

// -- Presentations ------------------------------------------------------------

fn read_presentation(bytes: &[u8]) -> Result<Vec<UnitOutcome>, FailureReason> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| FailureReason::Structural(format!("cannot open presentation archive: {err}")))?;

    let slides = slide_parts(&mut archive);
    if slides.is_empty() {
        return Err(FailureReason::Structural(
            "archive contains no slide parts".into(),
        ));
    }
    debug!(slides = slides.len(), "Slide parts found");

    let units = slides
        .iter()
        .enumerate()
        .map(|(index, (_, name))| match read_part(&mut archive, name) {
            Ok(xml) => match slide_text(&xml) {
                Ok(text) => UnitOutcome::recovered(index, text),
                Err((partial, reason)) if !partial.trim().is_empty() => {
                    warn!(slide = name.as_str(), %reason, "Slide XML damaged, keeping text read so far");
                    UnitOutcome::recovered(index, partial)
                }
                Err((_, reason)) => UnitOutcome::failed(index, reason),
            },
            Err(reason) => {
                warn!(slide = name.as_str(), %reason, "Slide part unreadable");
                UnitOutcome::failed(index, reason)
            }
        })
        .collect();

    Ok(units)
}

/// Slide part names with their slide numbers, in numeric order.
fn slide_parts<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Vec<(u32, String)> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix(SLIDE_PREFIX)?
                .strip_suffix(SLIDE_SUFFIX)?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);
    slides
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, FailureReason> {
    let mut file = archive
        .by_name(name)
        .map_err(|err| FailureReason::Structural(format!("{name}: {err}")))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .map_err(|err| FailureReason::Structural(format!("{name}: {err}")))?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Text of every `<a:t>` run, one line per `<a:p>` paragraph.
///
/// On malformed XML the text gathered before the fault is returned with the
/// error.
pub fn slide_text(xml: &str) -> Result<String, (String, FailureReason)> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => in_run = true,
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" => end_paragraph(&mut text),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"br" => text.push('\n'),
            Ok(Event::Text(e)) if in_run => match e.unescape() {
                Ok(run) => text.push_str(&run),
                Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
            },
            Ok(Event::CData(e)) if in_run => text.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                let reason = FailureReason::Structural(format!(
                    "malformed slide XML at byte {}: {err}",
                    reader.buffer_position()
                ));
                return Err((text, reason));
            }
        }
        buf.clear();
    }

    Ok(text.trim_end().to_string())
}

fn end_paragraph(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

// -- PDFs ---------------------------------------------------------------------

fn read_pdf(bytes: &[u8]) -> Result<Vec<UnitOutcome>, FailureReason> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|err| FailureReason::Structural(format!("cannot parse PDF: {err}")))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(FailureReason::Structural("PDF has no pages".into()));
    }
    debug!(pages = pages.len(), "PDF pages found");

    let units = pages
        .keys()
        .enumerate()
        .map(|(index, &page_number)| match doc.extract_text(&[page_number]) {
            Ok(text) => UnitOutcome::recovered(index, text),
            Err(err) => {
                warn!(page = page_number, error = %err, "Page text extraction failed");
                UnitOutcome::failed(index, FailureReason::Engine(err.to_string()))
            }
        })
        .collect();

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::config::ExtractionConfig;
    use std::io::Write;
    use std::sync::Arc;
    use zip::write::{SimpleFileOptions, ZipWriter};

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
       xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree><p:sp><p:txBody>
    <a:p><a:r><a:t>Quarterly </a:t></a:r><a:r><a:t>results &amp; outlook</a:t></a:r></a:p>
    <a:p><a:r><a:t>Revenue grew</a:t></a:r></a:p>
  </p:txBody></p:sp></p:spTree></p:cSld>
</p:sld>"#;

    fn deck(slides: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in slides {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn ctx() -> AdapterContext {
        AdapterContext::new(Arc::new(ExtractionConfig::default()), std::env::temp_dir())
    }

    #[test]
    fn runs_join_and_paragraphs_break() {
        assert_eq!(
            slide_text(SLIDE).unwrap(),
            "Quarterly results & outlook\nRevenue grew"
        );
    }

    #[test]
    fn slides_follow_numeric_order() {
        let slide = |t: &str| format!("<p:sld><a:p><a:r><a:t>{t}</a:t></a:r></a:p></p:sld>");
        let bytes = deck(&[
            ("ppt/slides/slide10.xml", &slide("ten")),
            ("ppt/slides/slide2.xml", &slide("two")),
            ("ppt/slides/_rels/slide2.xml.rels", "<Relationships/>"),
            ("ppt/slides/slide1.xml", &slide("one")),
        ]);
        let doc = SourceDocument::from_bytes("deck.pptx", DocumentFormat::Pptx, bytes, false);
        let units = StructuralParseAdapter.extract(&doc, &ctx()).unwrap();
        let texts: Vec<_> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "ten"]);
    }

    #[test]
    fn unreadable_archive_is_structural() {
        let doc = SourceDocument::from_bytes(
            "deck.pptx",
            DocumentFormat::Pptx,
            b"PK\x03\x04 truncated".to_vec(),
            false,
        );
        let err = StructuralParseAdapter.extract(&doc, &ctx()).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn damaged_xml_keeps_leading_text() {
        let (partial, reason) =
            slide_text("<a:p><a:r><a:t>kept</a:t></a:r></a:p><a:p></a:r>").unwrap_err();
        assert_eq!(partial.trim(), "kept");
        assert!(reason.is_structural());
    }

    #[test]
    fn slideless_deck_is_empty_output() {
        let bytes = deck(&[("ppt/slides/slide1.xml", "<p:sld><a:p/></p:sld>")]);
        let doc = SourceDocument::from_bytes("deck.pptx", DocumentFormat::Pptx, bytes, false);
        assert_eq!(
            StructuralParseAdapter.extract(&doc, &ctx()),
            Err(FailureReason::EmptyOutput)
        );
    }

    #[test]
    fn garbage_pdf_is_structural() {
        let doc = SourceDocument::from_bytes(
            "report.pdf",
            DocumentFormat::Pdf,
            b"%PDF-1.4\nthis is not a pdf body".to_vec(),
            false,
        );
        assert!(StructuralParseAdapter.extract(&doc, &ctx()).unwrap_err().is_structural());
    }
}
