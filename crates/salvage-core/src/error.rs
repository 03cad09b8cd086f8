// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Salvage.
//
// Only input-level and whole-chain failures live here. Per-strategy and
// per-unit failures are `FailureReason`s recorded on attempts.

use thiserror::Error;

/// Top-level error type for all Salvage operations.
#[derive(Debug, Error)]
pub enum SalvageError {
    // -- Extraction --
    #[error("unrecoverable input: {0}")]
    UnrecoverableInput(String),

    #[error("all {attempts} extraction attempts failed to produce any text")]
    ExtractionExhausted { attempts: usize },

    #[error("extraction cancelled before any usable text was recovered")]
    Cancelled,

    // -- Normalisation --
    #[error("sentence segmenter unavailable: {0}")]
    NlpUnavailable(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SalvageError>;
