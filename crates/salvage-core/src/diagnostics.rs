// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable diagnostics for fatal conditions.
//
// Every error that reaches the command line is mapped to a plain-language
// message with a concrete next step.

use crate::error::SalvageError;

/// A user-facing explanation of a fatal error.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// One-line summary of what went wrong.
    pub message: String,
    /// What the user can try next.
    pub suggestion: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n  hint: {}", self.message, self.suggestion)
    }
}

/// Convert a `SalvageError` into a message a person can act on.
pub fn describe(err: &SalvageError) -> Diagnostic {
    match err {
        SalvageError::UnrecoverableInput(detail) => Diagnostic {
            message: format!("The input cannot be recovered ({detail})."),
            suggestion: "Check that the path points at a PDF or PPTX file and that it is not empty."
                .into(),
        },

        SalvageError::ExtractionExhausted { attempts } => Diagnostic {
            message: format!("No text could be recovered after {attempts} attempts."),
            suggestion: "Re-run with --verbose to see why each strategy failed; installing \
                         pdftoppm and tesseract enables the OCR fallback."
                .into(),
        },

        SalvageError::Cancelled => Diagnostic {
            message: "Extraction was cancelled before any text was recovered.".into(),
            suggestion: "Run again and let the fallback chain finish.".into(),
        },

        SalvageError::NlpUnavailable(detail) => Diagnostic {
            message: format!("Sentence segmentation is unavailable ({detail})."),
            suggestion: "Check the --abbreviations path, or drop --use-nlp.".into(),
        },

        SalvageError::Config(detail) => Diagnostic {
            message: format!("The configuration is invalid: {detail}."),
            suggestion: "Fix the value in the config file or on the command line.".into(),
        },

        SalvageError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => Diagnostic {
                message: "A file could not be found.".into(),
                suggestion: format!("Check the path and try again. ({io_err})"),
            },
            std::io::ErrorKind::PermissionDenied => Diagnostic {
                message: "Permission was denied while reading or writing a file.".into(),
                suggestion: format!("Check file permissions. ({io_err})"),
            },
            _ => Diagnostic {
                message: "A file operation failed.".into(),
                suggestion: format!("Check free disk space and the output path. ({io_err})"),
            },
        },

        SalvageError::Serialization(detail) => Diagnostic {
            message: "A JSON document could not be read or written.".into(),
            suggestion: format!("Check the config file syntax. ({detail})"),
        },
    }
}
