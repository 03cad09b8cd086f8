// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Alternate parse — a second, independent parser.
//
// PDFs go through `pdf-extract`, whose content-stream interpreter copes with
// fonts and encodings lopdf's extractor gets wrong. Presentations are
// scanned as raw bytes: `<a:t>` runs that survive uncompressed and long
// printable runs are collected in order, so some text comes back even when
// the archive itself cannot be opened.

use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::LazyLock;

use regex::Regex;
use salvage_core::types::{DocumentFormat, FailureReason, StrategyKind, UnitOutcome};
use tracing::{debug, info, instrument};

use super::{AdapterContext, StrategyAdapter, single_unit};
use crate::source::SourceDocument;

static TEXT_RUN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>").ok());
static PRINTABLE_RUN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"[A-Za-z0-9\s.,;:?!'"\-_&]{10,}"#).ok());

/// Shortest `<a:t>` run worth keeping.
const MIN_RUN_CHARS: usize = 3;
/// Shortest free-standing printable run worth keeping.
const MIN_PRINTABLE_CHARS: usize = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct AlternateParseAdapter;

impl StrategyAdapter for AlternateParseAdapter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AlternateParse
    }

    #[instrument(skip_all, fields(format = %document.format(), repaired = document.is_repaired()))]
    fn extract(
        &self,
        document: &SourceDocument,
        _ctx: &AdapterContext,
    ) -> Result<Vec<UnitOutcome>, FailureReason> {
        let bytes = document.bytes()?;
        let text = match document.format() {
            DocumentFormat::Pdf => pdf_text(bytes)?,
            DocumentFormat::Pptx => recover_text_runs(bytes).join("\n"),
        };
        info!(chars = text.len(), "Alternate parse complete");
        single_unit(text)
    }
}

fn pdf_text(bytes: &[u8]) -> Result<String, FailureReason> {
    // pdf-extract panics on some malformed content streams.
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => Err(FailureReason::Structural(format!("pdf-extract: {err}"))),
        Err(_) => Err(FailureReason::Fault("pdf-extract panicked".into())),
    }
}

/// Text segments readable directly from the raw bytes, de-duplicated in
/// first-seen order.
pub fn recover_text_runs(bytes: &[u8]) -> Vec<String> {
    let data = String::from_utf8_lossy(bytes);
    let mut segments = Vec::new();

    if let Some(run) = TEXT_RUN.as_ref() {
        for capture in run.captures_iter(&data) {
            let Some(body) = capture.get(1) else {
                continue;
            };
            let text = unescape(body.as_str().trim());
            if text.chars().count() >= MIN_RUN_CHARS && !text.starts_with("<?xml") {
                segments.push(text);
            }
        }
    }

    if let Some(printable) = PRINTABLE_RUN.as_ref() {
        for found in printable.find_iter(&data) {
            let text = found.as_str().trim();
            if text.chars().count() >= MIN_PRINTABLE_CHARS {
                segments.push(text.to_string());
            }
        }
    }

    let mut seen = HashSet::new();
    segments.retain(|segment| seen.insert(segment.clone()));
    debug!(segments = segments.len(), "Text runs recovered from raw bytes");
    segments
}

fn unescape(raw: &str) -> String {
    quick_xml::escape::unescape(raw)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::config::ExtractionConfig;
    use std::sync::Arc;

    fn ctx() -> AdapterContext {
        AdapterContext::new(Arc::new(ExtractionConfig::default()), std::env::temp_dir())
    }

    #[test]
    fn runs_are_found_in_raw_bytes() {
        let mut raw = b"PK\x03\x04\x00\xff\xfe".to_vec();
        raw.extend_from_slice(b"<a:t>Annual report</a:t><a:t lang=\"en\">Tom &amp; Jerry</a:t>");
        raw.extend_from_slice(b"\x00\x01<a:t>ok</a:t>");
        let runs = recover_text_runs(&raw);
        assert_eq!(runs[0], "Annual report");
        assert_eq!(runs[1], "Tom & Jerry");
        assert!(!runs.iter().any(|r| r == "ok"));
    }

    #[test]
    fn duplicates_are_dropped() {
        let raw = b"<a:t>Same heading</a:t>\x00<a:t>Same heading</a:t>";
        let runs = recover_text_runs(raw);
        assert_eq!(runs.iter().filter(|r| *r == "Same heading").count(), 1);
    }

    #[test]
    fn unopenable_archive_still_yields_text() {
        let raw = b"\x00\x00<a:t>Recovered slide title</a:t>\xff\xff".to_vec();
        let doc = SourceDocument::from_bytes("deck.pptx", DocumentFormat::Pptx, raw, false);
        let units = AlternateParseAdapter.extract(&doc, &ctx()).unwrap();
        assert!(units[0].text.contains("Recovered slide title"));
    }

    #[test]
    fn binary_noise_is_empty_output() {
        let doc = SourceDocument::from_bytes(
            "deck.pptx",
            DocumentFormat::Pptx,
            vec![0u8, 0xff, 0x13, 0x80, 0x7f],
            false,
        );
        assert_eq!(
            AlternateParseAdapter.extract(&doc, &ctx()),
            Err(FailureReason::EmptyOutput)
        );
    }
}
