// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quality scorer — a deterministic usability score for extracted text.
//
// Three signals are combined:
//
// - the share of non-whitespace characters that are alphanumeric or common
//   punctuation (binary junk and U+FFFD replacement runs score low);
// - the share of tokens that contain an alphabetic run of two or more letters;
// - a penalty for a surplus of single-character tokens, the usual signature of
//   OCR output that split words into letters.

use salvage_core::config::ScoringWeights;
use serde::Serialize;

/// Single-character tokens that occur in ordinary prose.
const LEGITIMATE_SINGLES: &[char] = &['a', 'A', 'I', '&'];

/// Raw signals behind a score, useful for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualitySignals {
    pub printable_ratio: f64,
    pub word_ratio: f64,
    pub noise_ratio: f64,
}

/// Scores text for usability on a `[0, 1]` scale.
///
/// Pure: the same text and weights always give the same score.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer {
    weights: ScoringWeights,
}

impl QualityScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Usability score of `text`; empty or whitespace-only text scores 0.
    pub fn score(&self, text: &str) -> f64 {
        let Some(signals) = signals(text) else {
            return 0.0;
        };

        let w = &self.weights;
        let weighted = (w.printable * signals.printable_ratio + w.words * signals.word_ratio)
            / (w.printable + w.words);
        let penalty = w.noise_penalty * (signals.noise_ratio - w.noise_tolerance).max(0.0);

        (weighted - penalty).clamp(0.0, 1.0)
    }

    /// The signals for `text`, or `None` when it has no visible characters.
    pub fn signals(&self, text: &str) -> Option<QualitySignals> {
        signals(text)
    }
}

fn signals(text: &str) -> Option<QualitySignals> {
    let mut visible = 0usize;
    let mut printable = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        visible += 1;
        if c.is_alphanumeric() || is_common_punctuation(c) {
            printable += 1;
        }
    }
    if visible == 0 {
        return None;
    }

    let mut tokens = 0usize;
    let mut words = 0usize;
    let mut noise = 0usize;
    for token in text.split_whitespace() {
        tokens += 1;
        if has_alphabetic_run(token, 2) {
            words += 1;
        } else if is_noise_token(token) {
            noise += 1;
        }
    }

    Some(QualitySignals {
        printable_ratio: printable as f64 / visible as f64,
        word_ratio: words as f64 / tokens as f64,
        noise_ratio: noise as f64 / tokens as f64,
    })
}

fn has_alphabetic_run(token: &str, min_len: usize) -> bool {
    let mut run = 0;
    for c in token.chars() {
        if c.is_alphabetic() {
            run += 1;
            if run >= min_len {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn is_noise_token(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !c.is_ascii_digit() && !LEGITIMATE_SINGLES.contains(&c),
        _ => false,
    }
}

/// Punctuation and typographic symbols found in ordinary documents.
pub fn is_common_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '‘' | '’' | '“' | '”' | '„' | '«' | '»' | '–' | '—' | '…' | '•' | '·' | '°' | '§'
                | '©' | '®' | '™' | '€' | '£' | '¥' | '¢' | '‰' | '±' | '×' | '÷'
        )
}
