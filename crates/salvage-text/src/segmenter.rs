// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sentence segmentation.
//
// The default segmenter is rule based: a sentence ends at `.`, `!`, `?` or
// `…` (plus any closing quotes or brackets) when the next word starts a new
// sentence and the word before the stop is not an abbreviation, an initial,
// or a bare list number.

use std::collections::HashSet;
use std::ops::Range;

use salvage_core::SalvageError;
use thiserror::Error;
use tracing::debug;

use crate::config::SegmenterConfig;

#[derive(Debug, Error)]
pub enum SegmenterError {
    #[error("segmenter resources unavailable: {0}")]
    Unavailable(String),

    #[error("segmentation failed: {0}")]
    Failed(String),
}

/// Splits one paragraph into sentences, reported as byte ranges into it.
pub trait Segmenter: Send + Sync {
    fn sentences(&self, paragraph: &str) -> Result<Vec<Range<usize>>, SegmenterError>;
}

static ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "rev.", "hon.", "gen.",
    "col.", "capt.", "lt.", "sgt.", "gov.", "sen.", "rep.", "inc.", "ltd.", "co.", "corp.",
    "dept.", "univ.", "assn.", "bros.", "vs.", "etc.", "e.g.", "i.e.", "cf.", "al.", "approx.",
    "est.", "min.", "max.", "no.", "nos.", "vol.", "vols.", "pp.", "p.", "fig.", "figs.", "eq.",
    "ch.", "sec.", "art.", "ed.", "eds.", "jan.", "feb.", "mar.", "apr.", "jun.", "jul.", "aug.",
    "sep.", "sept.", "oct.", "nov.", "dec.", "mon.", "tue.", "wed.", "thu.", "fri.", "sat.",
    "sun.", "a.m.", "p.m.", "u.s.", "u.k.", "e.u.", "ph.d.", "b.a.", "m.a.", "b.sc.", "m.sc.",
    "ave.", "blvd.", "rd.", "ft.", "in.", "lb.", "lbs.", "oz.", "yr.", "yrs.", "hr.", "hrs.",
    "ref.", "tel.", "ext.",
];

/// Abbreviation and initial aware sentence splitter for English prose.
#[derive(Debug, Clone)]
pub struct RuleSegmenter {
    /// Lower-case, without the trailing dot.
    abbreviations: HashSet<String>,
}

impl Default for RuleSegmenter {
    fn default() -> Self {
        Self {
            abbreviations: ABBREVIATIONS.iter().map(|abbr| canonical(abbr)).collect(),
        }
    }
}

impl RuleSegmenter {
    /// Built-in abbreviations plus those listed in the configured file.
    pub fn load(config: &SegmenterConfig) -> Result<Self, SalvageError> {
        let mut segmenter = Self::default();
        let Some(path) = &config.abbreviations_file else {
            return Ok(segmenter);
        };

        let listing = std::fs::read_to_string(path).map_err(|err| {
            SalvageError::NlpUnavailable(format!("cannot read {}: {err}", path.display()))
        })?;
        let before = segmenter.abbreviations.len();
        segmenter.abbreviations.extend(
            listing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(canonical),
        );
        debug!(
            path = %path.display(),
            added = segmenter.abbreviations.len() - before,
            "Loaded abbreviations"
        );
        Ok(segmenter)
    }

    fn is_abbreviation(&self, word: &str) -> bool {
        let word = word.trim_start_matches(['(', '[', '"', '\'', '“', '‘']);
        is_initial(word) || self.abbreviations.contains(&canonical(word))
    }
}

impl Segmenter for RuleSegmenter {
    fn sentences(&self, paragraph: &str) -> Result<Vec<Range<usize>>, SegmenterError> {
        let mut ranges = Vec::new();
        let mut start = None;
        let mut chars = paragraph.char_indices().peekable();

        while let Some((at, c)) = chars.next() {
            if start.is_none() && !c.is_whitespace() {
                start = Some(at);
            }
            let Some(begin) = start else { continue };
            if !matches!(c, '.' | '!' | '?' | '…') {
                continue;
            }

            let mut end = at + c.len_utf8();
            while let Some(&(next_at, next)) = chars.peek() {
                if !matches!(next, '.' | '!' | '?' | '…' | '"' | '\'' | ')' | ']' | '”' | '’') {
                    break;
                }
                end = next_at + next.len_utf8();
                chars.next();
            }

            let rest = &paragraph[end..];
            if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                continue;
            }
            if c == '.' && !self.stop_ends_sentence(&paragraph[begin..end], rest) {
                continue;
            }

            ranges.push(begin..end);
            start = None;
        }

        if let Some(begin) = start {
            let end = begin + paragraph[begin..].trim_end().len();
            ranges.push(begin..end);
        }
        Ok(ranges)
    }
}

impl RuleSegmenter {
    /// Decide whether the full stop closing `sentence` is a boundary, given
    /// the text that follows it.
    fn stop_ends_sentence(&self, sentence: &str, rest: &str) -> bool {
        let Some(next) = rest.trim_start().chars().next() else {
            return true;
        };
        if next.is_lowercase() {
            return false;
        }

        let tail = sentence.trim_end_matches(['"', '\'', ')', ']', '”', '’']);
        let mut words = tail.split_whitespace();
        let Some(last) = words.next_back() else {
            return true;
        };
        if self.is_abbreviation(last) {
            return false;
        }
        // "3." opening a sentence is a list number, not a sentence.
        let number = last.trim_end_matches('.');
        let is_ordinal = !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
        !(is_ordinal && words.next().is_none())
    }
}

fn canonical(word: &str) -> String {
    word.trim_end_matches('.').to_lowercase()
}

/// `J.` or `J.R.` style initials.
fn is_initial(word: &str) -> bool {
    let mut chars = word.chars();
    loop {
        match (chars.next(), chars.next()) {
            (Some(letter), Some('.')) if letter.is_uppercase() => {}
            (None, _) => return !word.is_empty(),
            _ => return false,
        }
    }
}
