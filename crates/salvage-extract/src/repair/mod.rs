// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Corruption repair helper — best-effort fixes that make a damaged container
// parseable again before it is handed to a strategy.
//
// Repair is a pure function from bytes to possibly-improved bytes. It never
// fails: when nothing can be improved the input comes back untouched and the
// strategies treat it as just another possibly-broken document.

pub mod pdf;
pub mod zip;

use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};

use salvage_core::types::DocumentFormat;
use tracing::{debug, info, instrument, warn};

/// Output of [`repair`].
#[derive(Debug)]
pub struct Repaired<'a> {
    pub bytes: Cow<'a, [u8]>,
    /// Whether repair produced different bytes.
    pub changed: bool,
}

impl Repaired<'_> {
    fn unchanged(raw: &[u8]) -> Repaired<'_> {
        Repaired {
            bytes: Cow::Borrowed(raw),
            changed: false,
        }
    }

    pub fn into_owned(self) -> Vec<u8> {
        self.bytes.into_owned()
    }
}

/// Try to make `raw` parseable as `format`.
///
/// Returns the input unchanged when it already parses or when no repair
/// improves it.
#[instrument(skip(raw), fields(bytes_len = raw.len(), %format))]
pub fn repair(raw: &[u8], format: DocumentFormat) -> Repaired<'_> {
    let attempt = catch_unwind(AssertUnwindSafe(|| match format {
        DocumentFormat::Pptx => zip::rebuild_central_directory(raw),
        DocumentFormat::Pdf => pdf::rebuild_xref(raw),
    }));

    match attempt {
        Ok(Some(bytes)) => {
            info!(
                original_len = raw.len(),
                repaired_len = bytes.len(),
                "Container repaired"
            );
            Repaired {
                bytes: Cow::Owned(bytes),
                changed: true,
            }
        }
        Ok(None) => {
            debug!("Repair left the container unchanged");
            Repaired::unchanged(raw)
        }
        Err(_) => {
            warn!("Repair panicked; returning input unchanged");
            Repaired::unchanged(raw)
        }
    }
}
