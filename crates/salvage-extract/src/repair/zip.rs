// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zip central directory reconstruction.
//
// Office documents are zip archives. Truncated downloads and broken writers
// typically lose the central directory at the end of the file while the
// local entries before it are intact. The archive is rebuilt from the local
// file headers: every entry whose data is fully present is copied into a
// fresh archive with a new central directory.

use std::io::Cursor;

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::source::find;

const LOCAL_HEADER_SIG: &[u8] = b"PK\x03\x04";
const CENTRAL_HEADER_SIG: &[u8] = b"PK\x01\x02";
const DESCRIPTOR_SIG: &[u8] = b"PK\x07\x08";
const END_OF_CENTRAL_DIR_SIG: &[u8] = b"PK\x05\x06";

const LOCAL_HEADER_LEN: usize = 30;
/// Sizes are resolved from a trailing data descriptor.
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
const METHOD_STORED: u16 = 0;
/// Version made by: 2.0, MS-DOS attribute compatibility.
const VERSION_MADE_BY: u16 = 20;
const MAX_NAME_LEN: usize = 1024;

/// One local entry recovered from the raw bytes.
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub name: String,
    version_needed: u16,
    flags: u16,
    method: u16,
    mod_time: u16,
    mod_date: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    data_start: usize,
}

/// Rebuild the archive when its index is missing or inconsistent.
///
/// Returns `None` when the archive is already readable or when the rebuilt
/// archive would not be an improvement.
pub fn rebuild_central_directory(raw: &[u8]) -> Option<Vec<u8>> {
    let readable_before = readable_entries(raw);
    if let Some((total, readable)) = readable_before {
        if total > 0 && total == readable {
            return None;
        }
    }

    let entries = scan_local_entries(raw);
    if entries.is_empty() {
        debug!("No intact local file headers found");
        return None;
    }

    let rebuilt = write_archive(raw, &entries)?;
    let (total, readable) = readable_entries(&rebuilt)?;
    let before = readable_before.map(|(_, readable)| readable).unwrap_or(0);

    if total == 0 || readable <= before {
        warn!(before, after = readable, "Rebuilt archive is no improvement");
        return None;
    }

    debug!(entries = total, "Central directory rebuilt");
    Some(rebuilt)
}

/// `(entries listed, entries whose header can be opened)`, or `None` if the
/// archive index cannot be read at all.
fn readable_entries(raw: &[u8]) -> Option<(usize, usize)> {
    let mut archive = ZipArchive::new(Cursor::new(raw)).ok()?;
    let total = archive.len();
    let readable = (0..total)
        .filter(|&i| archive.by_index(i).is_ok())
        .count();
    Some((total, readable))
}

/// Walk the bytes for local file headers, keeping every entry whose data is
/// fully present. A later entry with the same name replaces an earlier one.
pub fn scan_local_entries(raw: &[u8]) -> Vec<LocalEntry> {
    let mut entries: Vec<LocalEntry> = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = find(&raw[cursor..], LOCAL_HEADER_SIG).map(|p| p + cursor) {
        match parse_local_entry(raw, offset) {
            Some((entry, data_end)) => {
                match entries.iter_mut().find(|e| e.name == entry.name) {
                    Some(existing) => *existing = entry,
                    None => entries.push(entry),
                }
                cursor = data_end;
            }
            None => cursor = offset + LOCAL_HEADER_SIG.len(),
        }
        if cursor >= raw.len() {
            break;
        }
    }

    entries
}

/// Parse the entry at `offset`, returning it with the end of its data.
fn parse_local_entry(raw: &[u8], offset: usize) -> Option<(LocalEntry, usize)> {
    let header = raw.get(offset..offset + LOCAL_HEADER_LEN)?;
    let version_needed = le_u16(header, 4);
    let flags = le_u16(header, 6);
    let method = le_u16(header, 8);
    let mod_time = le_u16(header, 10);
    let mod_date = le_u16(header, 12);
    let mut crc32 = le_u32(header, 14);
    let mut compressed_size = le_u32(header, 18);
    let mut uncompressed_size = le_u32(header, 22);
    let name_len = le_u16(header, 26) as usize;
    let extra_len = le_u16(header, 28) as usize;

    if name_len == 0 || name_len > MAX_NAME_LEN {
        return None;
    }
    let name_start = offset + LOCAL_HEADER_LEN;
    let name = std::str::from_utf8(raw.get(name_start..name_start + name_len)?).ok()?;
    let data_start = name_start + name_len + extra_len;
    if data_start > raw.len() {
        return None;
    }

    let data_end = if flags & FLAG_DATA_DESCRIPTOR != 0 {
        let descriptor = locate_descriptor(raw, data_start)?;
        crc32 = descriptor.crc32;
        compressed_size = descriptor.compressed_size;
        uncompressed_size = descriptor.uncompressed_size;
        descriptor.end
    } else {
        let end = data_start.checked_add(compressed_size as usize)?;
        if end > raw.len() {
            debug!(name, declared = compressed_size, "Entry data truncated, discarding");
            return None;
        }
        end
    };

    if method == METHOD_STORED && compressed_size != uncompressed_size {
        debug!(name, "Stored entry with mismatched sizes, discarding");
        return None;
    }

    let entry = LocalEntry {
        name: name.to_string(),
        version_needed,
        flags: flags & !FLAG_DATA_DESCRIPTOR,
        method,
        mod_time,
        mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        data_start,
    };
    Some((entry, data_end))
}

struct Descriptor {
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    /// First byte after the descriptor.
    end: usize,
}

/// Find the data descriptor that closes the entry starting at `data_start`.
///
/// The descriptor's compressed size must agree with its distance from the
/// data start, which rules out signatures that merely occur inside the data.
fn locate_descriptor(raw: &[u8], data_start: usize) -> Option<Descriptor> {
    let mut search = data_start;
    while let Some(pos) = find(&raw[search..], DESCRIPTOR_SIG).map(|p| p + search) {
        if let Some(fields) = raw.get(pos + 4..pos + 16) {
            let compressed_size = le_u32(fields, 4);
            if pos - data_start == compressed_size as usize {
                return Some(Descriptor {
                    crc32: le_u32(fields, 0),
                    compressed_size,
                    uncompressed_size: le_u32(fields, 8),
                    end: pos + 16,
                });
            }
        }
        search = pos + DESCRIPTOR_SIG.len();
    }

    // Descriptor without its optional signature: twelve bytes right before
    // the next header.
    let mut search = data_start;
    loop {
        let next = [LOCAL_HEADER_SIG, CENTRAL_HEADER_SIG]
            .iter()
            .filter_map(|sig| find(&raw[search..], sig).map(|p| p + search))
            .min()?;
        if next >= data_start + 12 {
            let fields = &raw[next - 12..next];
            let compressed_size = le_u32(fields, 4);
            if next - 12 - data_start == compressed_size as usize {
                return Some(Descriptor {
                    crc32: le_u32(fields, 0),
                    compressed_size,
                    uncompressed_size: le_u32(fields, 8),
                    end: next,
                });
            }
        }
        search = next + 4;
    }
}

/// Write `entries` into a fresh archive with a new central directory.
fn write_archive(raw: &[u8], entries: &[LocalEntry]) -> Option<Vec<u8>> {
    if entries.len() > u16::MAX as usize {
        return None;
    }

    let mut out = Vec::with_capacity(raw.len());
    let mut offsets = Vec::with_capacity(entries.len());

    for entry in entries {
        let offset = u32::try_from(out.len()).ok()?;
        offsets.push(offset);
        let data = raw.get(entry.data_start..entry.data_start + entry.compressed_size as usize)?;

        out.extend_from_slice(LOCAL_HEADER_SIG);
        put_u16(&mut out, entry.version_needed);
        put_u16(&mut out, entry.flags);
        put_u16(&mut out, entry.method);
        put_u16(&mut out, entry.mod_time);
        put_u16(&mut out, entry.mod_date);
        put_u32(&mut out, entry.crc32);
        put_u32(&mut out, entry.compressed_size);
        put_u32(&mut out, entry.uncompressed_size);
        put_u16(&mut out, entry.name.len() as u16);
        put_u16(&mut out, 0);
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(data);
    }

    let directory_start = u32::try_from(out.len()).ok()?;
    for (entry, offset) in entries.iter().zip(offsets) {
        out.extend_from_slice(CENTRAL_HEADER_SIG);
        put_u16(&mut out, VERSION_MADE_BY);
        put_u16(&mut out, entry.version_needed);
        put_u16(&mut out, entry.flags);
        put_u16(&mut out, entry.method);
        put_u16(&mut out, entry.mod_time);
        put_u16(&mut out, entry.mod_date);
        put_u32(&mut out, entry.crc32);
        put_u32(&mut out, entry.compressed_size);
        put_u32(&mut out, entry.uncompressed_size);
        put_u16(&mut out, entry.name.len() as u16);
        put_u16(&mut out, 0); // extra
        put_u16(&mut out, 0); // comment
        put_u16(&mut out, 0); // disk number start
        put_u16(&mut out, 0); // internal attributes
        put_u32(&mut out, 0); // external attributes
        put_u32(&mut out, offset);
        out.extend_from_slice(entry.name.as_bytes());
    }
    let directory_size = u32::try_from(out.len()).ok()? - directory_start;

    out.extend_from_slice(END_OF_CENTRAL_DIR_SIG);
    put_u16(&mut out, 0);
    put_u16(&mut out, 0);
    put_u16(&mut out, entries.len() as u16);
    put_u16(&mut out, entries.len() as u16);
    put_u32(&mut out, directory_size);
    put_u32(&mut out, directory_start);
    put_u16(&mut out, 0);

    Some(out)
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
