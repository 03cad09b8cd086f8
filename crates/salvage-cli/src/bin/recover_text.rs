// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// recover-text — pull readable text out of a damaged PPTX or PDF.
//
// Runs the fallback chain once and writes the merged text next to the input
// (or to `--output`). Nothing is written when no text could be recovered.
// Ctrl-C stops the chain and keeps the best result so far.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use chrono::Utc;
use clap::Parser;
use salvage_cli::{
    ExtractionOverrides, extraction_config, init_logging, recovered_output_path, recovery_summary,
    write_output,
};
use salvage_core::diagnostics::describe;
use salvage_core::error::Result;
use salvage_extract::{
    CancellationToken, ExtractionReport, Orchestrator, SourceDocument, SourceSummary, default_chain,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "recover-text", version)]
#[command(about = "Recover readable text from a corrupted PPTX or PDF document")]
struct Args {
    /// The PPTX or PDF file to recover
    input: PathBuf,

    /// Where to write the text (default: the input path with a .txt extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Scratch directory for converted and rendered pages; kept after the run
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Minimum quality score (0.0–1.0) an attempt needs to be accepted
    #[arg(long)]
    threshold: Option<f64>,

    /// Maximum number of pages recognised in parallel
    #[arg(long)]
    jobs: Option<usize>,

    /// JSON extraction config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON report of every attempt to stdout (status lines go to stderr)
    #[arg(long)]
    report: bool,
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
    let config = extraction_config(
        args.config.as_deref(),
        ExtractionOverrides {
            threshold: args.threshold,
            jobs: args.jobs,
            work_dir: args.work_dir.clone(),
        },
    )?;
    let document = SourceDocument::open(&args.input)?;
    let format = document.format();
    let source = SourceSummary::of(&document);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| recovered_output_path(&args.input));

    let started_at = Utc::now();
    let clock = Instant::now();
    let token = CancellationToken::new();
    let chain = default_chain(&config);
    let orchestrator = Orchestrator::new(config).with_cancellation(token.clone());

    // Timed-out strategies leave blocking threads behind; don't wait for them on exit.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(async {
        let interrupt = tokio::spawn(cancel_on_interrupt(token));
        let outcome = orchestrator.extract(document, chain).await;
        interrupt.abort();
        outcome
    });
    runtime.shutdown_background();
    let result = outcome?;

    write_output(&output, &result.text)?;

    // stdout carries only the JSON report, so it can be piped.
    eprintln!("{}", recovery_summary(&result, format, &output));

    if args.report {
        let elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = ExtractionReport::new(source, &result, started_at, elapsed_ms);
        println!("{}", report.to_json()?);
    }
    info!(status = ?result.status, "Done");
    Ok(())
}

async fn cancel_on_interrupt(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, stopping after the current step");
        token.cancel();
    }
}
