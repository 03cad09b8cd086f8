// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Salvage recovery pipeline.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Container format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Zip-based Office Open XML presentation.
    Pptx,
    Pdf,
}

impl DocumentFormat {
    /// File extension used when a copy of the document is written to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pptx => "pptx",
            Self::Pdf => "pdf",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pptx" | "pptm" | "ppsx" => Some(Self::Pptx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Word used for one independently recoverable unit of this format.
    pub fn unit_name(&self) -> &'static str {
        match self {
            Self::Pptx => "slide",
            Self::Pdf => "page",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Recovery strategies, declared in fallback priority order.
///
/// The derived `Ord` is the chain order: cheapest and most structural first,
/// rasterize-and-recognize last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Direct container/XML parse.
    StructuralParse,
    /// A second, independent pure parser.
    AlternateParse,
    /// General-purpose document conversion service.
    DocumentService,
    /// Render each unit to an image and run OCR on it.
    RasterRecognize,
}

impl StrategyKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::StructuralParse => "structural-parse",
            Self::AlternateParse => "alternate-parse",
            Self::DocumentService => "document-service",
            Self::RasterRecognize => "raster-recognize",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a strategy (or a single unit) produced no usable text.
///
/// These are recorded, never propagated past the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureReason {
    /// The container structure could not be parsed.
    #[error("structural fault: {0}")]
    Structural(String),

    /// The backing engine or tool is not installed or not configured.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("strategy produced no text")]
    EmptyOutput,

    #[error("timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    #[error("cancelled before completion")]
    Cancelled,

    /// An unexpected fault (panic or untyped error) inside the adapter.
    #[error("unexpected fault: {0}")]
    Fault(String),

    /// The engine ran but reported an error.
    #[error("engine error: {0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl FailureReason {
    /// Whether the failure points at a damaged container, which makes the
    /// corruption repair helper worth running.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }
}

impl From<std::io::Error> for FailureReason {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Text recovered for one page or slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutcome {
    /// Zero-based unit index in document order.
    pub index: usize,
    pub text: String,
    pub failure: Option<FailureReason>,
}

impl UnitOutcome {
    pub fn recovered(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            failure: None,
        }
    }

    pub fn failed(index: usize, reason: FailureReason) -> Self {
        Self {
            index,
            text: String::new(),
            failure: Some(reason),
        }
    }
}

/// One strategy invocation and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    pub strategy: StrategyKind,
    /// Position of the strategy in the fallback chain.
    pub ordinal: usize,
    /// Joined unit text, possibly empty.
    pub text: String,
    pub units: Vec<UnitOutcome>,
    /// Quality score in `[0, 1]`.
    pub score: f64,
    pub elapsed_ms: u64,
    pub failure: Option<FailureReason>,
    /// Whether the attempt ran against a repaired copy of the document.
    pub repaired: bool,
}

impl ExtractionAttempt {
    /// A score-0 attempt that never produced any text.
    pub fn failed(
        strategy: StrategyKind,
        ordinal: usize,
        reason: FailureReason,
        elapsed_ms: u64,
        repaired: bool,
    ) -> Self {
        Self {
            strategy,
            ordinal,
            text: String::new(),
            units: Vec::new(),
            score: 0.0,
            elapsed_ms,
            failure: Some(reason),
            repaired,
        }
    }
}

/// Byte range of one unit inside [`ExtractionResult::text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBoundary {
    pub index: usize,
    pub range: Range<usize>,
    pub failure: Option<FailureReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStatus {
    /// An attempt cleared the quality threshold.
    Accepted,
    /// Best effort: nothing cleared the threshold, the highest score won.
    Degraded,
}

/// The accepted output of the extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Every attempt, in the order it was made.
    pub attempts: Vec<ExtractionAttempt>,
    /// Index into `attempts` of the accepted attempt.
    pub accepted: usize,
    pub text: String,
    pub units: Vec<UnitBoundary>,
    pub confidence: f64,
    pub status: ExtractionStatus,
    /// Set when cancellation stopped the run before the chain finished.
    pub partial: bool,
}

impl ExtractionResult {
    /// Assemble a result from the recorded attempts, accepting `accepted`.
    ///
    /// Units are laid out in ascending index order and joined by a blank
    /// line; empty units keep a zero-length boundary.
    pub fn assemble(
        attempts: Vec<ExtractionAttempt>,
        accepted: usize,
        status: ExtractionStatus,
        partial: bool,
    ) -> Self {
        let (text, units, confidence) = match attempts.get(accepted) {
            Some(attempt) => {
                let (text, units) = join_units(&attempt.units);
                (text, units, attempt.score)
            }
            None => (String::new(), Vec::new(), 0.0),
        };

        Self {
            attempts,
            accepted,
            text,
            units,
            confidence,
            status,
            partial,
        }
    }

    /// The attempt whose text was accepted.
    pub fn accepted_attempt(&self) -> Option<&ExtractionAttempt> {
        self.attempts.get(self.accepted)
    }

    pub fn is_degraded(&self) -> bool {
        self.status == ExtractionStatus::Degraded
    }
}

/// Join unit texts in index order, recording each unit's byte range.
pub fn join_units(units: &[UnitOutcome]) -> (String, Vec<UnitBoundary>) {
    let mut ordered: Vec<&UnitOutcome> = units.iter().collect();
    ordered.sort_by_key(|unit| unit.index);

    let mut text = String::new();
    let mut boundaries = Vec::with_capacity(ordered.len());

    for unit in ordered {
        let body = unit.text.trim_end();
        if !body.is_empty() && !text.is_empty() {
            text.push_str("\n\n");
        }
        let start = text.len();
        text.push_str(body);
        boundaries.push(UnitBoundary {
            index: unit.index,
            range: start..text.len(),
            failure: unit.failure.clone(),
        });
    }

    (text, boundaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_order_is_chain_order() {
        let mut kinds = vec![
            StrategyKind::RasterRecognize,
            StrategyKind::StructuralParse,
            StrategyKind::DocumentService,
            StrategyKind::AlternateParse,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                StrategyKind::StructuralParse,
                StrategyKind::AlternateParse,
                StrategyKind::DocumentService,
                StrategyKind::RasterRecognize,
            ]
        );
    }

    #[test]
    fn join_restores_index_order() {
        let units = vec![
            UnitOutcome::recovered(2, "third"),
            UnitOutcome::recovered(0, "first"),
            UnitOutcome::failed(1, FailureReason::Timeout { after_ms: 10 }),
        ];
        let (text, bounds) = join_units(&units);
        assert_eq!(text, "first\n\nthird");
        assert_eq!(bounds.len(), 3);
        assert_eq!(bounds[0].index, 0);
        assert_eq!(&text[bounds[0].range.clone()], "first");
        assert!(bounds[1].range.is_empty());
        assert!(bounds[1].failure.is_some());
        assert_eq!(&text[bounds[2].range.clone()], "third");
    }

    #[test]
    fn only_structural_failures_trigger_repair() {
        assert!(FailureReason::Structural("bad xref".into()).is_structural());
        assert!(!FailureReason::EmptyOutput.is_structural());
        assert!(!FailureReason::Timeout { after_ms: 5 }.is_structural());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("pptx"), Some(DocumentFormat::Pptx));
        assert_eq!(DocumentFormat::from_extension("docx"), None);
    }
}
