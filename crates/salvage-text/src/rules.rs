// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cleaning rule set.
//
// Every rule is a pure `&str -> Cow<str>` transform that borrows when it has
// nothing to do, so the normaliser can count the rules that actually fired.
// No rule can fail.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static HORIZONTAL_WHITESPACE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[^\S\n]{2,}|[^\S \n]").ok());
static BLANK_RUNS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n{3,}").ok());
static PAGE_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:page|slide)\s+\d{1,4}(?:\s*(?:of|/)\s*\d{1,4})?$").ok());
static MARKUP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<[^<>\s][^<>]*>|\[\[?\w+\]\]?|\{\w+\}").ok());
static HYPHEN_BREAK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\w)-\n(\p{Ll})").ok());
static FOOTER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:confidential|proprietary|copyright)\b|©|\ball\s+rights\s+reserved\b|\bwww\.|\w@[\w-]+\.\w+",
    )
    .ok()
});
static LETTER_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\p{L}{3,}").ok());
static SLIDE_TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^slide\s+\d+").ok());
static SECTION_NUMBER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)*\s+\p{Lu}").ok());

/// Lines this long or longer are body text, never titles.
const HEADER_MAX_CHARS: usize = 60;

/// Shorter lines carry no content worth keeping under aggressive cleaning.
const MIN_CONTENT_CHARS: usize = 4;

/// Punctuation and typography that survive aggressive cleaning.
const COMMON_PUNCTUATION: &str = ".,;:!?'\"()[]{}<>-–—/\\&%$€£@#*+=_~^|…‘’“”•▪■□◆▫●○◦‣➢°§©®™";

/// CRLF and lone CR become LF; a form feed becomes a paragraph break.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains(['\r', '\x0c']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace("\r\n", "\n")
            .replace('\r', "\n")
            .replace('\x0c', "\n\n"),
    )
}

/// Any run of horizontal whitespace (tabs, no-break spaces, …) becomes one space.
pub fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    match HORIZONTAL_WHITESPACE.as_ref() {
        Some(re) => re.replace_all(text, " "),
        None => Cow::Borrowed(text),
    }
}

/// Leading and trailing whitespace removed from every line.
pub fn trim_lines(text: &str) -> Cow<'_, str> {
    if text.split('\n').all(|line| line.trim() == line) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.split('\n')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

/// Two or more consecutive blank lines become one. Expects trimmed lines.
pub fn collapse_blank_lines(text: &str) -> Cow<'_, str> {
    match BLANK_RUNS.as_ref() {
        Some(re) => re.replace_all(text, "\n\n"),
        None => Cow::Borrowed(text),
    }
}

/// Remove control characters, keeping line feeds.
pub fn strip_control(text: &str) -> Cow<'_, str> {
    retain(text, |c| c == '\n' || !c.is_control())
}

/// Remove everything outside letters, digits, whitespace and common punctuation.
pub fn strip_uncommon(text: &str) -> Cow<'_, str> {
    retain(text, |c| {
        c.is_alphanumeric() || c.is_whitespace() || COMMON_PUNCTUATION.contains(c)
    })
}

/// `!!!` becomes `!`, `.....` becomes `.`; runs of different marks are kept.
pub fn collapse_repeated_punctuation(text: &str) -> Cow<'_, str> {
    let repeats = |(a, b): (char, char)| a == b && is_punctuation(a);
    if !text.chars().zip(text.chars().skip(1)).any(repeats) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut previous = None;
    for c in text.chars() {
        if previous == Some(c) && is_punctuation(c) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    Cow::Owned(out)
}

/// `exam-\nple` becomes `example` when the continuation starts in lower case.
pub fn join_hyphenated(text: &str) -> Cow<'_, str> {
    match HYPHEN_BREAK.as_ref() {
        Some(re) => re.replace_all(text, "$1$2"),
        None => Cow::Borrowed(text),
    }
}

/// Running headers and footers left behind by slide and page rendering: lone
/// page numbers, `Page 3 of 12`, and lines carrying markup or formatting codes.
pub fn is_boilerplate(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    if line.len() <= 4 && line.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    pattern_hit(&PAGE_LABEL, line) || pattern_hit(&MARKUP, line)
}

/// Legal and contact footers: confidentiality notices, copyright lines,
/// web addresses and e-mail addresses.
pub fn is_footer(line: &str) -> bool {
    pattern_hit(&FOOTER, line)
}

/// Too short to matter, or without a run of three letters (stray codes,
/// figures and fragments).
pub fn lacks_content(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && (line.chars().count() < MIN_CONTENT_CHARS || !pattern_hit(&LETTER_RUN, line))
}

/// A slide or section title: short, and either ending in a colon, shouting,
/// title-cased, numbered (`2.1 Scope`) or labelled `Slide 4`.
pub fn is_slide_header(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.chars().count() >= HEADER_MAX_CHARS {
        return false;
    }
    if line.ends_with(':') || pattern_hit(&SLIDE_TITLE, line) {
        return true;
    }
    if line.ends_with(['.', '!', '?', ';', ',', '…']) {
        return false;
    }
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let shouting = letters >= 2 && !line.chars().any(char::is_lowercase);
    shouting || is_title_case(line) || pattern_hit(&SECTION_NUMBER, line)
}

/// Whether `line` ends a sentence or clause, so the next line stands alone.
pub fn ends_with_terminal(line: &str) -> bool {
    let trimmed = line.trim_end_matches(['"', '\'', ')', ']', '”', '’']);
    trimmed.ends_with(['.', '!', '?', ':', ';', '…'])
}

fn pattern_hit(re: &LazyLock<Option<Regex>>, line: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(line))
}

/// Two or more words, each starting with a capital.
fn is_title_case(line: &str) -> bool {
    let words: Vec<&str> = line
        .split_whitespace()
        .filter(|word| word.starts_with(char::is_alphabetic))
        .collect();
    words.len() >= 2 && words.iter().all(|word| word.starts_with(char::is_uppercase))
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || matches!(c, '…' | '–' | '—' | '•')
}

fn retain(text: &str, keep: impl Fn(char) -> bool) -> Cow<'_, str> {
    if text.chars().all(&keep) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| keep(c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_endings_and_form_feeds() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\x0cd"), "a\nb\nc\n\nd");
        assert!(matches!(normalize_line_endings("plain\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn whitespace_runs_become_single_spaces() {
        assert_eq!(collapse_whitespace("a \t b\u{a0}c\n  d"), "a b c\n d");
        assert!(matches!(collapse_whitespace("a b\nc"), Cow::Borrowed(_)));
    }

    #[test]
    fn lines_are_trimmed_and_blank_runs_collapsed() {
        assert_eq!(trim_lines(" a \n b"), "a\nb");
        assert_eq!(collapse_blank_lines("a\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
    }

    #[test]
    fn control_characters_go_but_newlines_stay() {
        assert_eq!(strip_control("a\x07b\n\x1bc\u{85}"), "ab\nc");
    }

    #[test]
    fn uncommon_characters_are_dropped() {
        assert_eq!(strip_uncommon("Résumé ☃ 50% — “ok”"), "Résumé  50% — “ok”");
    }

    #[test]
    fn repeated_punctuation_collapses() {
        assert_eq!(collapse_repeated_punctuation("Wait!!! Really?? ..."), "Wait! Really? .");
        assert_eq!(collapse_repeated_punctuation("?!"), "?!");
        assert!(matches!(collapse_repeated_punctuation("a.b"), Cow::Borrowed(_)));
    }

    #[test]
    fn hyphenated_breaks_rejoin_only_before_lower_case() {
        assert_eq!(join_hyphenated("exam-\nple"), "example");
        assert_eq!(join_hyphenated("North-\nEast"), "North-\nEast");
    }

    #[test]
    fn boilerplate_lines() {
        assert!(is_boilerplate("12"));
        assert!(is_boilerplate("Page 3 of 12"));
        assert!(is_boilerplate("slide 4"));
        assert!(is_boilerplate("<a:t>leftover</a:t>"));
        assert!(is_boilerplate("[TITLE] placeholder"));
        assert!(!is_boilerplate("Sales rose 12% in 2023"));
        assert!(!is_boilerplate("x < y"));
        assert!(!is_boilerplate(""));
    }

    #[test]
    fn legal_and_contact_footers() {
        assert!(is_footer("CONFIDENTIAL – internal use only"));
        assert!(is_footer("© 2024 Acme Corp"));
        assert!(is_footer("Copyright Acme Corp"));
        assert!(is_footer("All  rights reserved"));
        assert!(is_footer("Proprietary and confidential"));
        assert!(is_footer("Visit www.acme.example"));
        assert!(is_footer("Questions: sales@acme.example"));
        assert!(!is_footer("Our rights to the brand were reserved"));
        assert!(!is_footer("Meet us @ the booth"));
    }

    #[test]
    fn contentless_lines() {
        assert!(lacks_content("OK"));
        assert!(lacks_content("12.5%"));
        assert!(lacks_content("x y z w"));
        assert!(lacks_content("3 of 12"));
        assert!(!lacks_content("Q3 sales"));
        assert!(!lacks_content("Résumé"));
        assert!(!lacks_content(""));
    }

    #[test]
    fn slide_headers() {
        assert!(is_slide_header("QUARTERLY RESULTS"));
        assert!(is_slide_header("Key Findings"));
        assert!(is_slide_header("Agenda:"));
        assert!(is_slide_header("Slide 4 – Outlook"));
        assert!(is_slide_header("2.1 Scope of work"));
        assert!(!is_slide_header("Then"));
        assert!(!is_slide_header("Revenue grew in"));
        assert!(!is_slide_header("Key Findings."));
        assert!(!is_slide_header("3 of 12"));
        assert!(!is_slide_header("I"));
        assert!(!is_slide_header(&"Long Title ".repeat(6)));
    }

    #[test]
    fn terminal_punctuation() {
        assert!(ends_with_terminal("Done."));
        assert!(ends_with_terminal("He said “stop.”"));
        assert!(ends_with_terminal("Agenda:"));
        assert!(!ends_with_terminal("and then"));
    }
}
