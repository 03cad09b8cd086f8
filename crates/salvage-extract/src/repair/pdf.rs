// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF cross-reference reconstruction.
//
// When the xref table or `startxref` pointer is damaged the object bodies are
// usually still in place. The file is scanned for `N G obj` headers, and a
// fresh xref section plus trailer is appended so lopdf can resolve objects
// again. Objects packed inside object streams are not recovered here.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::bytes::Regex;
use tracing::{debug, warn};

use crate::source::find;

static OBJECT_HEADER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{1,10})\s+(\d{1,5})\s+obj\b").ok());
static ROOT_REFERENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/Root\s+(\d{1,10})\s+(\d{1,5})\s+R").ok());
static CATALOG_TYPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/Type\s*/Catalog\b").ok());

const SYNTHETIC_HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

/// Object number to `(byte offset, generation)`.
pub type ObjectOffsets = BTreeMap<u32, (usize, u16)>;

/// Append a rebuilt xref section when lopdf cannot load `raw`.
///
/// Returns `None` when the document already loads, when no objects or
/// catalog can be found, or when lopdf still rejects the rebuilt file.
pub fn rebuild_xref(raw: &[u8]) -> Option<Vec<u8>> {
    if lopdf::Document::load_mem(raw).is_ok() {
        return None;
    }

    let mut body = Vec::with_capacity(raw.len() + SYNTHETIC_HEADER.len() + 1024);
    if find(&raw[..raw.len().min(1024)], b"%PDF-").is_none() {
        body.extend_from_slice(SYNTHETIC_HEADER);
    }
    body.extend_from_slice(raw);

    let objects = scan_objects(&body);
    if objects.is_empty() {
        debug!("No object headers found");
        return None;
    }
    let Some((root, root_gen)) = find_root(&body, &objects) else {
        debug!(objects = objects.len(), "No document catalog found");
        return None;
    };

    let rebuilt = append_xref(body, &objects, root, root_gen);
    match lopdf::Document::load_mem(&rebuilt) {
        Ok(_) => {
            debug!(objects = objects.len(), root, "Cross-reference table rebuilt");
            Some(rebuilt)
        }
        Err(err) => {
            warn!(error = %err, "Rebuilt PDF still does not load");
            None
        }
    }
}

/// Locate every plausible `N G obj` header. Later definitions of the same
/// object number win, matching incremental-update semantics.
pub fn scan_objects(body: &[u8]) -> ObjectOffsets {
    let mut objects = ObjectOffsets::new();
    let Some(header) = OBJECT_HEADER.as_ref() else {
        return objects;
    };

    for capture in header.captures_iter(body) {
        let Some(whole) = capture.get(0) else {
            continue;
        };
        let start = whole.start();
        if start > 0 && !body[start - 1].is_ascii_whitespace() {
            continue;
        }
        if !starts_object_body(&body[whole.end()..]) {
            continue;
        }
        let (Some(number), Some(generation)) = (
            capture.get(1).and_then(|m| parse_ascii::<u32>(m.as_bytes())),
            capture.get(2).and_then(|m| parse_ascii::<u16>(m.as_bytes())),
        ) else {
            continue;
        };
        objects.insert(number, (start, generation));
    }

    objects
}

/// Whether the bytes after `obj` begin a PDF object.
fn starts_object_body(rest: &[u8]) -> bool {
    match rest.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(&b) => matches!(b, b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n' | b'-' | b'+' | b'.')
            || b.is_ascii_digit(),
        None => false,
    }
}

/// The catalog reference: the last trailer's `/Root`, else the last object
/// typed `/Catalog`.
fn find_root(body: &[u8], objects: &ObjectOffsets) -> Option<(u32, u16)> {
    let from_trailer = ROOT_REFERENCE.as_ref().and_then(|re| {
        re.captures_iter(body)
            .filter_map(|c| {
                let number = parse_ascii::<u32>(c.get(1)?.as_bytes())?;
                let generation = parse_ascii::<u16>(c.get(2)?.as_bytes())?;
                Some((number, generation))
            })
            .filter(|(number, _)| objects.contains_key(number))
            .last()
    });
    if from_trailer.is_some() {
        return from_trailer;
    }

    let catalog = CATALOG_TYPE.as_ref()?.find_iter(body).last()?;
    objects
        .iter()
        .filter(|(_, (offset, _))| *offset < catalog.start())
        .max_by_key(|(_, (offset, _))| *offset)
        .map(|(number, (_, generation))| (*number, *generation))
}

fn append_xref(mut body: Vec<u8>, objects: &ObjectOffsets, root: u32, root_gen: u16) -> Vec<u8> {
    if !body.ends_with(b"\n") {
        body.push(b'\n');
    }
    let size = objects.keys().next_back().map_or(1, |max| max + 1);
    let xref_offset = body.len();

    body.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
    body.extend_from_slice(b"0000000000 65535 f\r\n");
    for number in 1..size {
        let entry = match objects.get(&number) {
            Some((offset, generation)) => format!("{offset:010} {generation:05} n\r\n"),
            None => "0000000000 00000 f\r\n".to_string(),
        };
        body.extend_from_slice(entry.as_bytes());
    }
    body.extend_from_slice(
        format!(
            "trailer\n<< /Size {size} /Root {root} {root_gen} R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        )
        .as_bytes(),
    );
    body
}

fn parse_ascii<T: std::str::FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A one-page PDF whose xref is missing and whose `startxref` is bogus.
    fn broken_pdf() -> Vec<u8> {
        let content = "BT /F1 24 Tf 72 700 Td (Hello World) Tj ET";
        let mut pdf = String::from("%PDF-1.4\n");
        pdf.push_str("1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        pdf.push_str("2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
        pdf.push_str(
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>\nendobj\n",
        );
        pdf.push_str(&format!(
            "4 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
            content.len(),
            content
        ));
        pdf.push_str("5 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n");
        pdf.push_str("startxref\n999999\n%%EOF\n");
        pdf.into_bytes()
    }

    #[test]
    fn scan_finds_all_objects() {
        let objects = scan_objects(&broken_pdf());
        assert_eq!(objects.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn catalog_found_without_trailer() {
        let body = broken_pdf();
        let objects = scan_objects(&body);
        assert_eq!(find_root(&body, &objects), Some((1, 0)));
    }

    #[test]
    fn appended_xref_points_at_object_headers() {
        let body = broken_pdf();
        let objects = scan_objects(&body);
        let rebuilt = append_xref(body.clone(), &objects, 1, 0);
        let text = String::from_utf8_lossy(&rebuilt);
        assert!(text.contains("xref\n0 6\n"));
        assert!(text.contains("/Root 1 0 R"));
        let (offset, _) = objects[&3];
        assert!(body[offset..].starts_with(b"3 0 obj"));
    }

    #[test]
    fn repaired_document_loads() {
        let raw = broken_pdf();
        let bytes = rebuild_xref(&raw).unwrap_or(raw);
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn text_without_objects_is_left_alone() {
        assert!(rebuild_xref(b"%PDF-1.4\nnothing here\n").is_none());
    }

    #[test]
    fn number_inside_stream_is_not_a_header() {
        let body = b"1 0 obj\n<< >>\nendobj\nx12 0 obj y\n";
        let objects = scan_objects(body);
        assert_eq!(objects.len(), 1);
    }
}
