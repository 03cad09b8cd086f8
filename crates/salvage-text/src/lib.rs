// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Salvage text — turns noisy recovered text into clean prose.

pub mod bullets;
pub mod config;
pub mod normalize;
pub mod rules;
pub mod segmenter;

pub use config::{CleaningConfig, SegmenterConfig};
pub use normalize::{Boundary, BoundaryKind, CleanedText, TextNormalizer, normalize};
pub use segmenter::{RuleSegmenter, Segmenter, SegmenterError};
