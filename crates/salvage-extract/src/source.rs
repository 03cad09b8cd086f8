// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source document handle — format detection and a lazily loaded, read-only
// view of the input bytes shared by every strategy.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use salvage_core::error::{Result, SalvageError};
use salvage_core::types::DocumentFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

/// How many leading bytes are inspected for a format signature.
const SNIFF_LEN: u64 = 1024;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
/// Local header, empty-archive end record, spanned-archive marker.
const ZIP_SIGNATURES: [&[u8]; 3] = [ZIP_LOCAL_HEADER, b"PK\x05\x06", b"PK\x07\x08"];
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Immutable handle to the document being recovered.
///
/// The raw bytes are read on first use and then shared read-only; a repaired
/// copy is a separate `SourceDocument`, never a mutation of this one.
#[derive(Debug)]
pub struct SourceDocument {
    path: PathBuf,
    format: DocumentFormat,
    size: u64,
    repaired: bool,
    bytes: OnceLock<Vec<u8>>,
}

impl SourceDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a document from the filesystem and detect its container format.
    ///
    /// Fails fast with [`SalvageError::UnrecoverableInput`] for missing,
    /// zero-byte, or non-container input; no strategy is attempted for those.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|err| {
            SalvageError::UnrecoverableInput(format!("cannot read {}: {}", path.display(), err))
        })?;

        if !metadata.is_file() {
            return Err(SalvageError::UnrecoverableInput(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(SalvageError::UnrecoverableInput(format!(
                "{} is empty",
                path.display()
            )));
        }

        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;

        let document = Self {
            path: path.to_path_buf(),
            format: DocumentFormat::Pdf,
            size: metadata.len(),
            repaired: false,
            bytes: OnceLock::new(),
        };

        let format = match sniff_format(&head) {
            Some(format) => format,
            None => {
                // No signature up front: accept the extension's word only if
                // the body still carries markers of that container.
                let hinted = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(DocumentFormat::from_extension);
                let body = document.bytes()?;
                match hinted {
                    Some(format) if carries_markers(body, format) => format,
                    _ => {
                        return Err(SalvageError::UnrecoverableInput(format!(
                            "{} is neither a zip-based presentation nor a PDF",
                            path.display()
                        )));
                    }
                }
            }
        };

        info!(%format, size = metadata.len(), "Source document opened");
        Ok(Self { format, ..document })
    }

    /// Wrap bytes already in memory, e.g. a repaired copy.
    pub fn from_bytes(
        path: impl Into<PathBuf>,
        format: DocumentFormat,
        bytes: Vec<u8>,
        repaired: bool,
    ) -> Self {
        let size = bytes.len() as u64;
        Self {
            path: path.into(),
            format,
            size,
            repaired,
            bytes: OnceLock::from(bytes),
        }
    }

    // -- Inspection -----------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether these bytes came out of the corruption repair helper.
    pub fn is_repaired(&self) -> bool {
        self.repaired
    }

    /// The raw bytes, loaded from disk on first access.
    pub fn bytes(&self) -> std::io::Result<&[u8]> {
        if let Some(bytes) = self.bytes.get() {
            return Ok(bytes);
        }
        let data = std::fs::read(&self.path)?;
        debug!(bytes_len = data.len(), "Source bytes loaded");
        Ok(self.bytes.get_or_init(|| data))
    }

    /// SHA-256 of the raw bytes, hex encoded.
    pub fn fingerprint(&self) -> std::io::Result<String> {
        let digest = Sha256::digest(self.bytes()?);
        Ok(hex::encode(digest))
    }

    /// A path on disk holding exactly these bytes.
    ///
    /// Untouched documents resolve to their original path; repaired or
    /// in-memory copies are written into `work_dir` once, keyed by content.
    pub fn materialize(&self, work_dir: &Path) -> std::io::Result<PathBuf> {
        if !self.repaired && self.path.is_file() {
            return Ok(self.path.clone());
        }

        std::fs::create_dir_all(work_dir)?;
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let fingerprint = self.fingerprint()?;
        let target = work_dir.join(format!(
            "{}-{}.{}",
            stem,
            &fingerprint[..16],
            self.format.extension()
        ));
        if !target.is_file() {
            std::fs::write(&target, self.bytes()?)?;
            debug!(path = %target.display(), "Document copy written to work dir");
        }
        Ok(target)
    }
}

/// Identify the container from its leading bytes.
///
/// Any zip counts as a presentation here; a zip without slide parts fails
/// later as a structural fault.
pub fn sniff_format(head: &[u8]) -> Option<DocumentFormat> {
    if ZIP_SIGNATURES.iter().any(|signature| head.starts_with(signature)) {
        return Some(DocumentFormat::Pptx);
    }
    if find(head, PDF_MAGIC).is_some() {
        return Some(DocumentFormat::Pdf);
    }
    None
}

fn carries_markers(body: &[u8], format: DocumentFormat) -> bool {
    match format {
        DocumentFormat::Pptx => find(body, ZIP_LOCAL_HEADER).is_some(),
        DocumentFormat::Pdf => find(body, b" obj").is_some() || find(body, PDF_MAGIC).is_some(),
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
