// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalisation settings. Built once per invocation and passed by reference.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which optional passes the normaliser runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Drop uncommon characters, repeated punctuation and boilerplate lines.
    pub aggressive: bool,
    /// Keep list markers byte-for-byte and clean only the text after them.
    pub preserve_bullets: bool,
    /// Rejoin broken lines and report sentence/paragraph boundaries.
    pub use_nlp: bool,
}

/// Resources for the rule-based sentence segmenter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Extra abbreviations, one per line. Blank lines and `#` comments are ignored.
    pub abbreviations_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_only_the_base_rules() {
        let config = CleaningConfig::default();
        assert!(!config.aggressive && !config.preserve_bullets && !config.use_nlp);
        assert!(SegmenterConfig::default().abbreviations_file.is_none());
    }
}
