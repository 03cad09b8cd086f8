// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction orchestrator — drives the fallback chain.
//
// Strategies run cheapest-first. Each attempt is scored, and the first one
// that clears the quality threshold wins; nothing after it is invoked. A
// structural failure triggers one repair of the document, after which the
// failing strategy is retried on the repaired bytes and every later strategy
// sees the repaired copy too. When the chain runs dry the best-scoring
// attempt is returned as a degraded result.
//
// Adapters are blocking code. Each call runs on tokio's blocking pool under
// a timeout; a panic there becomes a `Fault` on the attempt instead of
// taking the run down. A timed-out call is abandoned and its thread
// finishes in the background; external tools it launched see the same
// deadline and are killed when it passes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use salvage_core::config::ExtractionConfig;
use salvage_core::error::{Result, SalvageError};
use salvage_core::types::{
    ExtractionAttempt, ExtractionResult, ExtractionStatus, FailureReason, UnitOutcome, join_units,
};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancellationToken;
use crate::quality::QualityScorer;
use crate::repair::repair;
use crate::source::SourceDocument;
use crate::strategy::{AdapterContext, StrategyAdapter};
use crate::tool;

/// Shorthand for a fallback chain.
pub type StrategyChain = Vec<Arc<dyn StrategyAdapter>>;

pub struct Orchestrator {
    config: Arc<ExtractionConfig>,
    scorer: QualityScorer,
    strategy_timeout: Duration,
    unit_timeout: Duration,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            scorer: QualityScorer::new(config.weights),
            strategy_timeout: config.strategy_timeout(),
            unit_timeout: config.unit_timeout(),
            config: Arc::new(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Share an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Override the configured timeouts with finer-grained values.
    pub fn with_timeouts(mut self, strategy: Duration, unit: Duration) -> Self {
        self.strategy_timeout = strategy;
        self.unit_timeout = unit;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the fallback chain over `document`.
    #[instrument(skip_all, fields(path = %document.path().display(), format = %document.format()))]
    pub async fn extract(
        &self,
        document: SourceDocument,
        chain: StrategyChain,
    ) -> Result<ExtractionResult> {
        let threshold = self.config.quality_threshold;
        let mut chain = chain;
        chain.sort_by_key(|adapter| adapter.kind());

        let work_dir = WorkDir::prepare(self.config.work_dir.clone())?;
        let ctx = Arc::new(AdapterContext::new(
            Arc::clone(&self.config),
            work_dir.path.clone(),
        ));

        let mut current = Arc::new(document);
        let mut attempts: Vec<ExtractionAttempt> = Vec::new();
        let mut partial = false;

        info!(strategies = chain.len(), threshold, "Starting extraction");

        'chain: for (ordinal, adapter) in chain.iter().enumerate() {
            // A strategy is retried at most once, after a successful repair.
            for _ in 0..2 {
                if self.cancel.is_cancelled() {
                    partial = true;
                    break 'chain;
                }

                let attempt = self.attempt(adapter, &current, ordinal, &ctx).await;
                let structural = attempt.failure.as_ref().is_some_and(|f| f.is_structural());
                let accepted = attempt.failure.is_none() && attempt.score >= threshold;
                attempts.push(attempt);

                if accepted {
                    info!(strategy = %adapter.kind(), "Attempt accepted");
                    let index = attempts.len() - 1;
                    return Ok(ExtractionResult::assemble(
                        attempts,
                        index,
                        ExtractionStatus::Accepted,
                        self.cancel.is_cancelled(),
                    ));
                }
                if self.cancel.is_cancelled() {
                    partial = true;
                    break 'chain;
                }
                if !structural || current.is_repaired() {
                    continue 'chain;
                }
                match repair_document(&current).await {
                    Some(repaired) => current = Arc::new(repaired),
                    None => continue 'chain,
                }
            }
        }

        let best = attempts
            .iter()
            .enumerate()
            .filter(|(_, attempt)| attempt.score > 0.0)
            .fold(None::<(usize, f64)>, |best, (index, attempt)| match best {
                Some((_, score)) if score >= attempt.score => best,
                _ => Some((index, attempt.score)),
            });

        match best {
            Some((index, score)) => {
                warn!(
                    strategy = %attempts[index].strategy,
                    score,
                    threshold,
                    partial,
                    "No attempt cleared the quality threshold; returning best effort"
                );
                Ok(ExtractionResult::assemble(
                    attempts,
                    index,
                    ExtractionStatus::Degraded,
                    partial,
                ))
            }
            None if partial => Err(SalvageError::Cancelled),
            None => Err(SalvageError::ExtractionExhausted {
                attempts: attempts.len(),
            }),
        }
    }

    /// Invoke one strategy and score what it returns.
    async fn attempt(
        &self,
        adapter: &Arc<dyn StrategyAdapter>,
        document: &Arc<SourceDocument>,
        ordinal: usize,
        ctx: &Arc<AdapterContext>,
    ) -> ExtractionAttempt {
        let kind = adapter.kind();
        let repaired = document.is_repaired();
        let started = Instant::now();
        debug!(strategy = %kind, ordinal, repaired, "Invoking strategy");

        let plan = {
            let (adapter, document, ctx) = (Arc::clone(adapter), Arc::clone(document), Arc::clone(ctx));
            run_blocking(self.strategy_timeout, move || {
                Ok(adapter.unit_plan(&document, &ctx))
            })
            .await
        };

        let outcome = match plan {
            Err(reason) => Err(reason),
            Ok(Some(Err(reason))) => Err(reason),
            Ok(Some(Ok(count))) => Ok(self.run_units(adapter, document, ctx, count).await),
            Ok(None) => {
                let (adapter, document, ctx) =
                    (Arc::clone(adapter), Arc::clone(document), Arc::clone(ctx));
                run_blocking(self.strategy_timeout, move || adapter.extract(&document, &ctx)).await
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let units = match outcome {
            Ok(units) => units,
            Err(reason) => {
                warn!(strategy = %kind, ordinal, %reason, "Strategy failed");
                return ExtractionAttempt::failed(kind, ordinal, reason, elapsed_ms, repaired);
            }
        };

        let (text, _) = join_units(&units);
        let score = self.scorer.score(&text);
        let failure = if text.is_empty() {
            Some(
                units
                    .iter()
                    .find_map(|unit| unit.failure.clone())
                    .unwrap_or(FailureReason::EmptyOutput),
            )
        } else {
            None
        };
        info!(strategy = %kind, ordinal, score, elapsed_ms, units = units.len(), "Attempt scored");

        ExtractionAttempt {
            strategy: kind,
            ordinal,
            text,
            units,
            score,
            elapsed_ms,
            failure,
            repaired,
        }
    }

    /// Drive a per-unit strategy with bounded concurrency.
    ///
    /// Units complete in any order; the returned list is in index order,
    /// with timed-out, failed and cancelled units present as empty outcomes.
    async fn run_units(
        &self,
        adapter: &Arc<dyn StrategyAdapter>,
        document: &Arc<SourceDocument>,
        ctx: &Arc<AdapterContext>,
        count: usize,
    ) -> Vec<UnitOutcome> {
        let limit = self.config.concurrency_limit().max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        let mut outcomes: Vec<UnitOutcome> = Vec::with_capacity(count);
        debug!(units = count, concurrency = limit, "Dispatching units");

        for index in 0..count {
            if self.cancel.is_cancelled() {
                outcomes.push(UnitOutcome::failed(index, FailureReason::Cancelled));
                continue;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                outcomes.push(UnitOutcome::failed(
                    index,
                    FailureReason::Fault("unit scheduler closed".into()),
                ));
                continue;
            };
            if self.cancel.is_cancelled() {
                outcomes.push(UnitOutcome::failed(index, FailureReason::Cancelled));
                continue;
            }

            let (adapter, document, ctx) = (Arc::clone(adapter), Arc::clone(document), Arc::clone(ctx));
            let unit_timeout = self.unit_timeout;
            tasks.spawn(async move {
                let _permit = permit;
                let result = run_blocking(unit_timeout, move || {
                    adapter.extract_unit(&document, index, &ctx)
                })
                .await;
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(text))) => outcomes.push(UnitOutcome::recovered(index, text)),
                Ok((index, Err(reason))) => {
                    warn!(unit = index, %reason, "Unit failed");
                    outcomes.push(UnitOutcome::failed(index, reason));
                }
                Err(err) => warn!(error = %err, "Unit task lost"),
            }
        }

        // Any index without an outcome belongs to a lost task.
        let mut seen = vec![false; count];
        for outcome in &outcomes {
            if let Some(slot) = seen.get_mut(outcome.index) {
                *slot = true;
            }
        }
        for (index, _) in seen.iter().enumerate().filter(|(_, seen)| !**seen) {
            outcomes.push(UnitOutcome::failed(
                index,
                FailureReason::Fault("unit task did not report".into()),
            ));
        }

        outcomes.sort_by_key(|outcome| outcome.index);
        outcomes
    }
}

/// Run the whole chain with default settings and the given threshold.
pub async fn extract(
    document: SourceDocument,
    chain: StrategyChain,
    quality_threshold: f64,
) -> Result<ExtractionResult> {
    let config = ExtractionConfig {
        quality_threshold,
        ..Default::default()
    };
    config.validate()?;
    Orchestrator::new(config).extract(document, chain).await
}

/// Run `f` on the blocking pool, bounded by `limit`. Tools `f` launches
/// share the same deadline.
async fn run_blocking<T, F>(limit: Duration, f: F) -> std::result::Result<T, FailureReason>
where
    F: FnOnce() -> std::result::Result<T, FailureReason> + Send + 'static,
    T: Send + 'static,
{
    let deadline = Instant::now() + limit;
    let task = tokio::task::spawn_blocking(move || tool::with_deadline(deadline, f));
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(fault_from_join(err)),
        Err(_) => Err(FailureReason::Timeout {
            after_ms: limit.as_millis() as u64,
        }),
    }
}

fn fault_from_join(err: JoinError) -> FailureReason {
    if !err.is_panic() {
        return FailureReason::Fault("task cancelled".into());
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "adapter panicked".into());
    FailureReason::Fault(message)
}

/// Repair the document's bytes off the async threads. `None` when the
/// bytes are unreadable or repair changed nothing.
async fn repair_document(document: &Arc<SourceDocument>) -> Option<SourceDocument> {
    let document = Arc::clone(document);
    let repaired = tokio::task::spawn_blocking(move || {
        let bytes = document.bytes().ok()?;
        let repaired = repair(bytes, document.format());
        if !repaired.changed {
            return None;
        }
        Some(SourceDocument::from_bytes(
            document.path().to_path_buf(),
            document.format(),
            repaired.into_owned(),
            true,
        ))
    })
    .await
    .ok()
    .flatten();

    match &repaired {
        Some(doc) => info!(size = doc.size(), "Continuing with repaired document"),
        None => debug!("Repair made no difference"),
    }
    repaired
}

/// Scratch directory for one run. A directory the orchestrator created
/// itself is removed when the run ends.
struct WorkDir {
    path: PathBuf,
    owned: bool,
}

impl WorkDir {
    fn prepare(configured: Option<PathBuf>) -> std::io::Result<Self> {
        let (path, owned) = match configured {
            Some(path) => (path, false),
            None => (
                std::env::temp_dir().join(format!("salvage-{}", uuid::Uuid::new_v4().simple())),
                true,
            ),
        };
        std::fs::create_dir_all(&path)?;
        debug!(path = %path.display(), owned, "Work directory ready");
        Ok(Self { path, owned })
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.owned {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvage_core::types::{DocumentFormat, StrategyKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const GOOD: &str = "Quarterly revenue grew across every region, led by a strong third quarter.";
    const WEAK: &str = "ok 12 34 56";
    const SOUP: &str = "T h e q u i c k b r o w n f o x";

    struct Fixed {
        kind: StrategyKind,
        text: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(kind: StrategyKind, text: &'static str) -> (Arc<AtomicUsize>, Arc<dyn StrategyAdapter>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let adapter = Arc::new(Self {
                kind,
                text,
                calls: Arc::clone(&calls),
            });
            (calls, adapter)
        }
    }

    impl StrategyAdapter for Fixed {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn extract(
            &self,
            _: &SourceDocument,
            _: &AdapterContext,
        ) -> std::result::Result<Vec<UnitOutcome>, FailureReason> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![UnitOutcome::recovered(0, self.text)])
        }
    }

    struct Failing(StrategyKind, FailureReason);

    impl StrategyAdapter for Failing {
        fn kind(&self) -> StrategyKind {
            self.0
        }

        fn extract(
            &self,
            _: &SourceDocument,
            _: &AdapterContext,
        ) -> std::result::Result<Vec<UnitOutcome>, FailureReason> {
            Err(self.1.clone())
        }
    }

    struct Panics;

    impl StrategyAdapter for Panics {
        fn kind(&self) -> StrategyKind {
            StrategyKind::StructuralParse
        }

        fn extract(
            &self,
            _: &SourceDocument,
            _: &AdapterContext,
        ) -> std::result::Result<Vec<UnitOutcome>, FailureReason> {
            panic!("parser exploded")
        }
    }

    struct Sleeps(Duration);

    impl StrategyAdapter for Sleeps {
        fn kind(&self) -> StrategyKind {
            StrategyKind::DocumentService
        }

        fn extract(
            &self,
            _: &SourceDocument,
            _: &AdapterContext,
        ) -> std::result::Result<Vec<UnitOutcome>, FailureReason> {
            std::thread::sleep(self.0);
            Ok(vec![UnitOutcome::recovered(0, GOOD)])
        }
    }

    /// Per-unit adapter whose unit `slow` sleeps for `delay`.
    struct Pages {
        count: usize,
        slow: Option<usize>,
        delay: Duration,
    }

    impl StrategyAdapter for Pages {
        fn kind(&self) -> StrategyKind {
            StrategyKind::RasterRecognize
        }

        fn extract(
            &self,
            _: &SourceDocument,
            _: &AdapterContext,
        ) -> std::result::Result<Vec<UnitOutcome>, FailureReason> {
            unreachable!("per-unit adapters are driven unit by unit")
        }

        fn unit_plan(
            &self,
            _: &SourceDocument,
            _: &AdapterContext,
        ) -> Option<std::result::Result<usize, FailureReason>> {
            Some(Ok(self.count))
        }

        fn extract_unit(
            &self,
            _: &SourceDocument,
            index: usize,
            _: &AdapterContext,
        ) -> std::result::Result<String, FailureReason> {
            if self.slow == Some(index) {
                std::thread::sleep(self.delay);
            }
            Ok(format!("Recovered text for page number {index}"))
        }
    }

    /// Trips the token while running, returning weak text.
    struct CancelsMidway(CancellationToken);

    impl StrategyAdapter for CancelsMidway {
        fn kind(&self) -> StrategyKind {
            StrategyKind::StructuralParse
        }

        fn extract(
            &self,
            _: &SourceDocument,
            _: &AdapterContext,
        ) -> std::result::Result<Vec<UnitOutcome>, FailureReason> {
            self.0.cancel();
            Ok(vec![UnitOutcome::recovered(0, WEAK)])
        }
    }

    /// Structural failure until it sees a repaired document.
    struct NeedsRepair;

    impl StrategyAdapter for NeedsRepair {
        fn kind(&self) -> StrategyKind {
            StrategyKind::StructuralParse
        }

        fn extract(
            &self,
            document: &SourceDocument,
            _: &AdapterContext,
        ) -> std::result::Result<Vec<UnitOutcome>, FailureReason> {
            if document.is_repaired() {
                Ok(vec![UnitOutcome::recovered(0, GOOD)])
            } else {
                Err(FailureReason::Structural("central directory missing".into()))
            }
        }
    }

    fn pdf() -> SourceDocument {
        SourceDocument::from_bytes(
            "report.pdf",
            DocumentFormat::Pdf,
            b"%PDF-1.4 damaged beyond repair".to_vec(),
            false,
        )
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(ExtractionConfig::default())
    }

    #[tokio::test]
    async fn first_passing_strategy_wins_and_stops_the_chain() {
        let (alternate_calls, alternate) = Fixed::new(StrategyKind::AlternateParse, GOOD);
        let (structural_calls, structural) = Fixed::new(StrategyKind::StructuralParse, GOOD);
        let (raster_calls, raster) = Fixed::new(StrategyKind::RasterRecognize, GOOD);

        let result = orchestrator()
            .extract(pdf(), vec![raster, alternate, structural])
            .await
            .unwrap();

        assert_eq!(result.status, ExtractionStatus::Accepted);
        assert_eq!(result.attempts.len(), 1);
        assert_eq!(result.accepted_attempt().unwrap().strategy, StrategyKind::StructuralParse);
        assert_eq!(result.text, GOOD);
        assert_eq!(structural_calls.load(Ordering::SeqCst), 1);
        assert_eq!(alternate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(raster_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_zero_scores_exhaust_the_chain() {
        let (_, soup) = Fixed::new(StrategyKind::AlternateParse, SOUP);
        let chain: StrategyChain = vec![
            Arc::new(Failing(StrategyKind::StructuralParse, FailureReason::EmptyOutput)),
            soup,
            Arc::new(Failing(
                StrategyKind::DocumentService,
                FailureReason::Unavailable("tika".into()),
            )),
        ];
        let err = orchestrator().extract(pdf(), chain).await.unwrap_err();
        assert!(matches!(err, SalvageError::ExtractionExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn panicking_adapter_is_recorded_as_fault() {
        let (_, fallback) = Fixed::new(StrategyKind::AlternateParse, GOOD);
        let result = orchestrator()
            .extract(pdf(), vec![Arc::new(Panics), fallback])
            .await
            .unwrap();

        match &result.attempts[0].failure {
            Some(FailureReason::Fault(message)) => assert!(message.contains("parser exploded")),
            other => panic!("expected fault, got {other:?}"),
        }
        assert_eq!(result.accepted, 1);
    }

    #[tokio::test]
    async fn slow_strategy_times_out() {
        let (_, raster) = Fixed::new(StrategyKind::RasterRecognize, GOOD);
        let result = orchestrator()
            .with_timeouts(Duration::from_millis(50), Duration::from_millis(50))
            .extract(pdf(), vec![Arc::new(Sleeps(Duration::from_millis(500))), raster])
            .await
            .unwrap();

        assert!(matches!(
            result.attempts[0].failure,
            Some(FailureReason::Timeout { after_ms: 50 })
        ));
        assert_eq!(result.accepted_attempt().unwrap().strategy, StrategyKind::RasterRecognize);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timed_out_service_process_is_killed() {
        use crate::strategy::DocumentServiceAdapter;
        use salvage_core::config::ServiceCommand;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("converter.pid");
        let service = DocumentServiceAdapter::new(ServiceCommand {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                format!("echo $$ > {}; exec sleep 30", pid_file.display()),
                "sh".into(),
            ],
        });

        let result = orchestrator()
            .with_timeouts(Duration::from_millis(300), Duration::from_millis(300))
            .extract(pdf(), vec![Arc::new(service)])
            .await;
        assert!(matches!(result, Err(SalvageError::ExtractionExhausted { attempts: 1 })));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let proc_entry = std::path::PathBuf::from(format!("/proc/{}", pid.trim()));
        let give_up = Instant::now() + Duration::from_secs(5);
        while proc_entry.exists() && Instant::now() < give_up {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!proc_entry.exists(), "converter outlived its deadline");
    }

    #[tokio::test]
    async fn timed_out_unit_leaves_an_empty_slot_in_order() {
        let config = ExtractionConfig {
            ocr_concurrency: Some(2),
            ..Default::default()
        };
        let pages = Pages {
            count: 5,
            slow: Some(2),
            delay: Duration::from_millis(800),
        };
        let result = Orchestrator::new(config)
            .with_timeouts(Duration::from_secs(5), Duration::from_millis(100))
            .extract(pdf(), vec![Arc::new(pages)])
            .await
            .unwrap();

        let attempt = result.accepted_attempt().unwrap();
        let indices: Vec<_> = attempt.units.iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(attempt.units.iter().filter(|u| u.failure.is_none()).count(), 4);
        assert!(attempt.units[2].text.is_empty());
        assert!(matches!(
            attempt.units[2].failure,
            Some(FailureReason::Timeout { .. })
        ));

        assert_eq!(result.units.len(), 5);
        assert!(result.units[2].range.is_empty());
        assert!(result.text.starts_with("Recovered text for page number 0"));
        assert!(result.text.ends_with("Recovered text for page number 4"));
    }

    #[tokio::test]
    async fn weak_text_is_returned_degraded() {
        let (_, weak) = Fixed::new(StrategyKind::StructuralParse, WEAK);
        let chain: StrategyChain = vec![
            weak,
            Arc::new(Failing(StrategyKind::AlternateParse, FailureReason::EmptyOutput)),
        ];
        let result = orchestrator().extract(pdf(), chain).await.unwrap();

        assert!(result.is_degraded());
        assert_eq!(result.accepted, 0);
        assert_eq!(result.text, WEAK);
        assert_eq!(result.attempts.len(), 2);
        assert!(result.confidence > 0.0 && result.confidence < 0.6);
    }

    #[tokio::test]
    async fn cancellation_before_start_is_an_error() {
        let orchestrator = orchestrator();
        orchestrator.cancellation_token().cancel();
        let (calls, adapter) = Fixed::new(StrategyKind::StructuralParse, GOOD);
        let err = orchestrator.extract(pdf(), vec![adapter]).await.unwrap_err();
        assert!(matches!(err, SalvageError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_returns_best_so_far_as_partial() {
        let token = CancellationToken::new();
        let (later_calls, later) = Fixed::new(StrategyKind::AlternateParse, GOOD);
        let result = orchestrator()
            .with_cancellation(token.clone())
            .extract(pdf(), vec![Arc::new(CancelsMidway(token)), later])
            .await
            .unwrap();

        assert!(result.partial);
        assert!(result.is_degraded());
        assert_eq!(result.text, WEAK);
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn structural_failure_is_retried_on_repaired_bytes() {
        use std::io::{Cursor, Write};
        use zip::write::{SimpleFileOptions, ZipWriter};

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("ppt/slides/slide1.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<p:sld/>").unwrap();
        let mut bytes = writer.finish().unwrap().into_inner();
        let directory = crate::source::find(&bytes, b"PK\x01\x02").unwrap();
        bytes.truncate(directory);

        let document = SourceDocument::from_bytes("deck.pptx", DocumentFormat::Pptx, bytes, false);
        let (_, alternate) = Fixed::new(StrategyKind::AlternateParse, GOOD);
        let result = orchestrator()
            .extract(document, vec![Arc::new(NeedsRepair), alternate])
            .await
            .unwrap();

        assert_eq!(result.attempts.len(), 2);
        assert!(!result.attempts[0].repaired);
        assert!(result.attempts[1].repaired);
        assert_eq!(result.attempts[1].strategy, StrategyKind::StructuralParse);
        assert_eq!(result.accepted, 1);
    }

    #[tokio::test]
    async fn configured_work_dir_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().join("scratch");
        let config = ExtractionConfig {
            work_dir: Some(work_dir.clone()),
            ..Default::default()
        };
        let (_, adapter) = Fixed::new(StrategyKind::StructuralParse, GOOD);
        Orchestrator::new(config).extract(pdf(), vec![adapter]).await.unwrap();
        assert!(work_dir.is_dir());
    }
}
