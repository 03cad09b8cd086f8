// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Machine-readable summary of one extraction run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use salvage_core::types::{
    DocumentFormat, ExtractionResult, ExtractionStatus, StrategyKind,
};
use serde::Serialize;
use uuid::Uuid;

use crate::source::SourceDocument;

/// What was known about the input before extraction took ownership of it.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub size: u64,
    /// SHA-256 of the input bytes; `None` if they could not be read.
    pub sha256: Option<String>,
}

impl SourceSummary {
    pub fn of(document: &SourceDocument) -> Self {
        Self {
            path: document.path().to_path_buf(),
            format: document.format(),
            size: document.size(),
            sha256: document.fingerprint().ok(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub strategy: StrategyKind,
    pub ordinal: usize,
    pub score: f64,
    pub elapsed_ms: u64,
    pub repaired: bool,
    pub units_recovered: usize,
    pub units_failed: usize,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub source: SourceSummary,
    pub status: ExtractionStatus,
    pub accepted_strategy: Option<StrategyKind>,
    pub confidence: f64,
    pub partial: bool,
    pub characters: usize,
    pub attempts: Vec<AttemptSummary>,
}

impl ExtractionReport {
    pub fn new(
        source: SourceSummary,
        result: &ExtractionResult,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let attempts = result
            .attempts
            .iter()
            .map(|attempt| AttemptSummary {
                strategy: attempt.strategy,
                ordinal: attempt.ordinal,
                score: attempt.score,
                elapsed_ms: attempt.elapsed_ms,
                repaired: attempt.repaired,
                units_recovered: attempt
                    .units
                    .iter()
                    .filter(|unit| unit.failure.is_none())
                    .count(),
                units_failed: attempt
                    .units
                    .iter()
                    .filter(|unit| unit.failure.is_some())
                    .count(),
                failure: attempt.failure.as_ref().map(ToString::to_string),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            started_at,
            elapsed_ms,
            source,
            status: result.status,
            accepted_strategy: result.accepted_attempt().map(|attempt| attempt.strategy),
            confidence: result.confidence,
            partial: result.partial,
            characters: result.text.chars().count(),
            attempts,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
