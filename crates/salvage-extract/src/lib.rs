// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Salvage extraction — corruption repair, quality scoring, strategy adapters,
// and the orchestrator that drives them as a fallback chain.
//
// # Feature Gates
//
// - `ocr` — enables the pure-Rust `ocrs` recognizer for the
//   rasterize-and-recognize strategy. Without it, OCR goes through the
//   `tesseract` command-line engine.

pub mod cancel;
pub mod orchestrator;
pub mod quality;
pub mod raster;
pub mod repair;
pub mod report;
pub mod source;
pub mod strategy;
mod tool;

pub use cancel::CancellationToken;
pub use orchestrator::{Orchestrator, StrategyChain, extract};
pub use quality::QualityScorer;
pub use report::{ExtractionReport, SourceSummary};
pub use source::SourceDocument;
pub use strategy::{AdapterContext, StrategyAdapter, default_chain};
