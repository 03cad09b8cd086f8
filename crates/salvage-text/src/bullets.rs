// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// List marker detection.
//
// A marker is either a bullet glyph (the space after it is optional, since
// recovered slide text often loses it) or a numbering token followed by
// whitespace: `3.`, `3)`, `(3)`, `b)`, `iv.`.

use std::sync::LazyLock;

use regex::Regex;

/// Glyphs that open a bulleted line.
pub const BULLET_SYMBOLS: &[char] = &[
    '-', '•', '*', '▪', '■', '□', '◆', '▫', '●', '○', '◦', '‣', '➢', '–',
];

static NUMBERING: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}[.)]|\(\d{1,3}\)|[A-Za-z]\)|(?:[ivxlc]{1,6}|[IVXLC]{1,6})\.)(?:\s+|$)")
        .ok()
});

/// Split `line` into its list marker (with any whitespace that follows it)
/// and the body. Returns `None` when the line is not a list item.
pub fn split_marker(line: &str) -> Option<(&str, &str)> {
    let first = line.chars().next()?;
    let marker_end = if BULLET_SYMBOLS.contains(&first) {
        let glyph = first.len_utf8();
        glyph + whitespace_len(&line[glyph..])
    } else {
        NUMBERING.as_ref()?.find(line)?.end()
    };
    Some(line.split_at(marker_end))
}

/// Whether `line` opens a list item.
pub fn is_list_item(line: &str) -> bool {
    split_marker(line).is_some()
}

fn whitespace_len(text: &str) -> usize {
    text.len() - text.trim_start().len()
}
