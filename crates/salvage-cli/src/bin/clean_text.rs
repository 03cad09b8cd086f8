// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// clean-text — normalise noisy extracted text.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use salvage_cli::{cleaned_output_path, init_logging, read_text_lossy, write_output};
use salvage_core::diagnostics::describe;
use salvage_core::error::Result;
use salvage_text::{CleaningConfig, SegmenterConfig, TextNormalizer};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "clean-text", version)]
#[command(about = "Clean and restructure text recovered from slides or scanned pages")]
struct Args {
    /// The text file to clean
    input: PathBuf,

    /// Where to write the result (default: <stem>_cleaned.<ext> beside the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Drop unusual characters, repeated punctuation, and page furniture
    #[arg(short, long)]
    aggressive: bool,

    /// Keep bullet and numbering markers exactly as written
    #[arg(short = 'b', long)]
    preserve_bullets: bool,

    /// Rejoin broken lines and detect sentence boundaries
    #[arg(short = 'n', long)]
    use_nlp: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Extra abbreviations for sentence detection, one per line
    #[arg(long)]
    abbreviations: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let raw = read_text_lossy(&args.input)?;
    let config = CleaningConfig {
        aggressive: args.aggressive,
        preserve_bullets: args.preserve_bullets,
        use_nlp: args.use_nlp,
    };
    let normalizer = if config.use_nlp {
        TextNormalizer::from_config(&SegmenterConfig {
            abbreviations_file: args.abbreviations,
        })
    } else {
        TextNormalizer::default()
    };

    let cleaned = normalizer.normalize(&raw, &config);
    let output = args
        .output
        .unwrap_or_else(|| cleaned_output_path(&args.input));
    write_output(&output, &cleaned.text)?;

    debug!(boundaries = cleaned.boundaries.len(), "Segmentation summary");
    println!(
        "Cleaned text written to {} ({} changes)",
        output.display(),
        cleaned.transformations
    );
    if cleaned.nlp_skipped {
        println!("Sentence segmentation was unavailable and has been skipped");
    }
    Ok(())
}
