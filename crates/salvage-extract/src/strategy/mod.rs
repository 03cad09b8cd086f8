// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strategy adapters — interchangeable ways of turning a document into text.
//
// Every adapter satisfies the same contract, so the orchestrator drives the
// fallback chain without knowing which concrete adapter it is talking to.
// Adapters are synchronous; the orchestrator moves them onto blocking
// threads and bounds them with timeouts.

pub mod alternate;
pub mod raster;
pub mod service;
pub mod structural;

use std::path::PathBuf;
use std::sync::Arc;

use salvage_core::config::ExtractionConfig;
use salvage_core::types::{FailureReason, StrategyKind, UnitOutcome};

use crate::source::SourceDocument;

pub use alternate::AlternateParseAdapter;
pub use raster::RasterRecognizeAdapter;
pub use service::DocumentServiceAdapter;
pub use structural::StructuralParseAdapter;

/// Per-run state handed to every adapter call.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub config: Arc<ExtractionConfig>,
    /// Scratch directory owned by this run.
    pub work_dir: PathBuf,
}

impl AdapterContext {
    pub fn new(config: Arc<ExtractionConfig>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            work_dir: work_dir.into(),
        }
    }
}

/// One way of extracting text from a [`SourceDocument`].
pub trait StrategyAdapter: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Extract the whole document. Units are pages or slides when the
    /// adapter can tell them apart, otherwise a single unit.
    fn extract(
        &self,
        document: &SourceDocument,
        ctx: &AdapterContext,
    ) -> Result<Vec<UnitOutcome>, FailureReason>;

    /// Number of units when this adapter works unit by unit.
    ///
    /// `None` means the adapter only supports [`extract`](Self::extract).
    fn unit_plan(
        &self,
        _document: &SourceDocument,
        _ctx: &AdapterContext,
    ) -> Option<Result<usize, FailureReason>> {
        None
    }

    /// Extract a single unit; only called when [`unit_plan`](Self::unit_plan)
    /// returned a count.
    fn extract_unit(
        &self,
        _document: &SourceDocument,
        _index: usize,
        _ctx: &AdapterContext,
    ) -> Result<String, FailureReason> {
        Err(FailureReason::Fault(format!(
            "{} does not extract individual units",
            self.kind()
        )))
    }
}

/// The full fallback chain in priority order.
pub fn default_chain(config: &ExtractionConfig) -> Vec<Arc<dyn StrategyAdapter>> {
    vec![
        Arc::new(StructuralParseAdapter),
        Arc::new(AlternateParseAdapter),
        Arc::new(DocumentServiceAdapter::new(config.service.clone())),
        Arc::new(RasterRecognizeAdapter::from_config(config)),
    ]
}

/// A single unit wrapping whole-document text, or an empty-output failure.
pub(crate) fn single_unit(text: String) -> Result<Vec<UnitOutcome>, FailureReason> {
    if text.trim().is_empty() {
        Err(FailureReason::EmptyOutput)
    } else {
        Ok(vec![UnitOutcome::recovered(0, text)])
    }
}

/// Fails with `EmptyOutput` when no unit carries any text.
pub(crate) fn require_text(units: Vec<UnitOutcome>) -> Result<Vec<UnitOutcome>, FailureReason> {
    if units.iter().all(|unit| unit.text.trim().is_empty()) {
        Err(FailureReason::EmptyOutput)
    } else {
        Ok(units)
    }
}
