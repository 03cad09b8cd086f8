// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text normalisation engine.
//
// Passes run in a fixed order:
//   1. layout: line endings, whitespace runs, trimming, blank-line runs
//   2. list markers are split off and protected (with `preserve_bullets`)
//   3. character cleanup on the unprotected text, plus removal of
//      boilerplate, footers and contentless lines under `aggressive`
//   4. with `use_nlp`: broken lines are rejoined; under `aggressive` any
//      line the merge turns into noise is dropped and the rest rejoined
//   5. with `aggressive` or `use_nlp`: slide titles open their own paragraph
//   6. with `use_nlp`: sentence/paragraph boundaries are reported over the
//      final text
//
// The output never carries trailing whitespace on a line, and non-empty
// output ends with exactly one newline. Normalising the output again with
// the same config returns it unchanged.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::bullets;
use crate::config::{CleaningConfig, SegmenterConfig};
use crate::rules;
use crate::segmenter::{RuleSegmenter, Segmenter, SegmenterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Sentence,
    Paragraph,
}

/// A structural span, as byte offsets into [`CleanedText::text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Boundary {
    pub kind: BoundaryKind,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedText {
    pub text: String,
    /// Empty unless segmentation ran.
    pub boundaries: Vec<Boundary>,
    /// Number of rule applications that changed the text.
    pub transformations: usize,
    /// Segmentation was requested but could not run.
    pub nlp_skipped: bool,
}

/// Applies the cleaning passes. Holds the sentence segmenter, if one is available.
#[derive(Clone)]
pub struct TextNormalizer {
    segmenter: Option<Arc<dyn Segmenter>>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(RuleSegmenter::default()))
    }
}

impl TextNormalizer {
    pub fn new(segmenter: Arc<dyn Segmenter>) -> Self {
        Self {
            segmenter: Some(segmenter),
        }
    }

    /// A normaliser that skips segmentation, flagging `nlp_skipped` when asked for it.
    pub fn without_segmenter() -> Self {
        Self { segmenter: None }
    }

    /// Load the rule segmenter; if its resources are unreadable, fall back
    /// to a normaliser without one.
    pub fn from_config(config: &SegmenterConfig) -> Self {
        match RuleSegmenter::load(config) {
            Ok(segmenter) => Self::new(Arc::new(segmenter)),
            Err(err) => {
                warn!(error = %err, "Sentence segmenter unavailable, segmentation will be skipped");
                Self::without_segmenter()
            }
        }
    }

    pub fn has_segmenter(&self) -> bool {
        self.segmenter.is_some()
    }

    #[instrument(skip_all, fields(chars = raw.len(), aggressive = config.aggressive, use_nlp = config.use_nlp))]
    pub fn normalize(&self, raw: &str, config: &CleaningConfig) -> CleanedText {
        let mut tally = Tally::default();

        let mut layout = raw.to_owned();
        tally.apply(&mut layout, rules::normalize_line_endings);
        tally.apply(&mut layout, rules::collapse_whitespace);
        tally.apply(&mut layout, rules::trim_lines);
        tally.apply(&mut layout, rules::collapse_blank_lines);

        let lines: Vec<String> = layout
            .split('\n')
            .filter_map(|line| clean_line(line, config, &mut tally))
            .collect();

        let mut nlp_skipped = false;
        if config.use_nlp {
            match &self.segmenter {
                Some(segmenter) => {
                    let mut merged_tally = tally.clone();
                    let merged = rejoin(lines.clone(), config, &mut merged_tally);
                    let text = assemble(&break_before_headers(merged, &mut merged_tally));
                    match segment(segmenter.as_ref(), &text) {
                        Ok(boundaries) => {
                            debug!(
                                transformations = merged_tally.0,
                                boundaries = boundaries.len(),
                                "Normalised with segmentation"
                            );
                            return CleanedText {
                                text,
                                boundaries,
                                transformations: merged_tally.0,
                                nlp_skipped: false,
                            };
                        }
                        Err(err) => {
                            warn!(error = %err, "Sentence segmentation failed, continuing without it");
                            nlp_skipped = true;
                        }
                    }
                }
                None => {
                    warn!("No sentence segmenter available, continuing without segmentation");
                    nlp_skipped = true;
                }
            }
        }

        let lines = if config.aggressive || config.use_nlp {
            break_before_headers(lines, &mut tally)
        } else {
            lines
        };
        let text = assemble(&lines);
        debug!(transformations = tally.0, "Normalised");
        CleanedText {
            text,
            boundaries: Vec::new(),
            transformations: tally.0,
            nlp_skipped,
        }
    }
}

/// Normalise with the built-in rule segmenter.
pub fn normalize(raw: &str, config: &CleaningConfig) -> CleanedText {
    TextNormalizer::default().normalize(raw, config)
}

#[derive(Debug, Clone, Default)]
struct Tally(usize);

impl Tally {
    fn apply(&mut self, text: &mut String, rule: fn(&str) -> Cow<'_, str>) {
        let changed = match rule(text) {
            Cow::Owned(changed) if changed != *text => changed,
            _ => return,
        };
        *text = changed;
        self.0 += 1;
    }
}

/// Character cleanup for one laid-out line. `None` drops the line.
fn clean_line(line: &str, config: &CleaningConfig, tally: &mut Tally) -> Option<String> {
    let (marker, body) = config
        .preserve_bullets
        .then(|| bullets::split_marker(line))
        .flatten()
        .unwrap_or(("", line));

    let mut body = body.to_owned();
    tally.apply(&mut body, rules::strip_control);
    if config.aggressive {
        tally.apply(&mut body, rules::strip_uncommon);
        tally.apply(&mut body, rules::collapse_repeated_punctuation);
    }
    tally.apply(&mut body, rules::collapse_whitespace);
    tally.apply(&mut body, rules::trim_lines);

    let mut cleaned = format!("{marker}{body}");
    cleaned.truncate(cleaned.trim_end().len());
    if config.aggressive && is_noise(&cleaned) {
        tally.0 += 1;
        return None;
    }
    Some(cleaned)
}

/// Lines aggressive cleaning drops. List items are always kept.
fn is_noise(line: &str) -> bool {
    !line.is_empty()
        && !bullets::is_list_item(line)
        && (rules::is_boilerplate(line) || rules::is_footer(line) || rules::lacks_content(line))
}

fn is_header(line: &str) -> bool {
    !bullets::is_list_item(line) && rules::is_slide_header(line)
}

/// Rejoin broken lines. Under `aggressive`, lines the merge turned into
/// noise (`Page` + `3 of 12`, a tag split by a hyphen) are dropped and the
/// survivors rejoined until nothing changes.
fn rejoin(mut lines: Vec<String>, config: &CleaningConfig, tally: &mut Tally) -> Vec<String> {
    loop {
        let merged = rejoin_lines(lines, tally);
        if !config.aggressive {
            return merged;
        }
        let before = merged.len();
        let kept: Vec<String> = merged.into_iter().filter(|line| !is_noise(line)).collect();
        if kept.len() == before {
            return kept;
        }
        tally.0 += before - kept.len();
        lines = kept;
    }
}

/// Merge each line lacking terminal punctuation with the next line, unless
/// either is blank or a title, or the next opens a list item. Hyphenated
/// breaks are closed up.
fn rejoin_lines(lines: Vec<String>, tally: &mut Tally) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let continues = !line.is_empty() && !bullets::is_list_item(&line) && !is_header(&line);
        if let Some(previous) = out.last_mut() {
            if continues
                && !previous.is_empty()
                && !rules::ends_with_terminal(previous)
                && !is_header(previous)
            {
                let broken = format!("{previous}\n{line}");
                *previous = match rules::join_hyphenated(&broken) {
                    Cow::Owned(joined) => joined,
                    Cow::Borrowed(_) => format!("{previous} {line}"),
                };
                tally.0 += 1;
                continue;
            }
        }
        out.push(line);
    }
    out
}

/// Slide titles start a paragraph of their own.
fn break_before_headers(lines: Vec<String>, tally: &mut Tally) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if is_header(&line) && out.last().is_some_and(|previous| !previous.is_empty()) {
            out.push(String::new());
            tally.0 += 1;
        }
        out.push(line);
    }
    out
}

fn assemble(lines: &[String]) -> String {
    let joined = lines.join("\n");
    let collapsed = rules::collapse_blank_lines(&joined);
    let mut text = collapsed.trim_matches('\n').to_owned();
    if !text.is_empty() {
        text.push('\n');
    }
    text
}

/// Paragraphs are runs of non-blank lines; sentences never cross a line break.
fn segment(segmenter: &dyn Segmenter, text: &str) -> Result<Vec<Boundary>, SegmenterError> {
    let mut boundaries = Vec::new();
    for paragraph in paragraphs(text) {
        let body = &text[paragraph.clone()];
        boundaries.push(Boundary {
            kind: BoundaryKind::Paragraph,
            range: paragraph.clone(),
        });
        for sentence in segmenter.sentences(body)? {
            if sentence.end > body.len() || !body.is_char_boundary(sentence.start) {
                return Err(SegmenterError::Failed(format!(
                    "sentence {sentence:?} outside paragraph of {} bytes",
                    body.len()
                )));
            }
            boundaries.extend(split_at_newlines(body, sentence).map(|range| Boundary {
                kind: BoundaryKind::Sentence,
                range: paragraph.start + range.start..paragraph.start + range.end,
            }));
        }
    }
    Ok(boundaries)
}

fn paragraphs(text: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut current: Option<Range<usize>> = None;
    let mut offset = 0;
    for line in text.split('\n') {
        let range = offset..offset + line.len();
        offset = range.end + 1;
        if line.is_empty() {
            out.extend(current.take());
        } else if let Some(open) = current.as_mut() {
            open.end = range.end;
        } else {
            current = Some(range);
        }
    }
    out.extend(current);
    out
}

fn split_at_newlines(body: &str, sentence: Range<usize>) -> impl Iterator<Item = Range<usize>> + '_ {
    let start = sentence.start;
    body[sentence]
        .split('\n')
        .scan(start, |offset, piece| {
            let range = *offset..*offset + piece.len();
            *offset = range.end + 1;
            Some(range)
        })
        .filter(|range| !range.is_empty())
}
