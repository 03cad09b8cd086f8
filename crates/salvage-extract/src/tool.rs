// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External tool invocation shared by the service, rasterizer, and OCR
// collaborators.
//
// The orchestrator bounds each blocking call with a deadline. A tool still
// running when that deadline passes is killed and reaped here; abandoning
// the thread alone would leave the process behind.

use std::cell::Cell;
use std::ffi::OsStr;
use std::io::{self, ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use salvage_core::types::FailureReason;
use tracing::{debug, warn};

/// Longest stderr excerpt carried into a failure reason.
const STDERR_EXCERPT: usize = 400;

/// How often a bounded child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

thread_local! {
    static DEADLINE: Cell<Option<Instant>> = const { Cell::new(None) };
}

/// Run `f` with every tool it launches on this thread bounded by `deadline`.
///
/// Scopes nest; the earlier deadline wins.
pub fn with_deadline<T>(deadline: Instant, f: impl FnOnce() -> T) -> T {
    let previous = DEADLINE.with(|slot| {
        let effective = slot.get().map_or(deadline, |outer| outer.min(deadline));
        slot.replace(Some(effective))
    });
    let _restore = RestoreDeadline(previous);
    f()
}

/// The deadline in force on this thread, if any.
pub fn current_deadline() -> Option<Instant> {
    DEADLINE.with(Cell::get)
}

struct RestoreDeadline(Option<Instant>);

impl Drop for RestoreDeadline {
    fn drop(&mut self) {
        DEADLINE.with(|slot| slot.set(self.0));
    }
}

/// Run `program` with `args`, optionally feeding `stdin`, and return stdout.
///
/// Bounded by the thread's [`with_deadline`] scope when there is one.
/// A missing executable maps to [`FailureReason::Unavailable`]; a non-zero
/// exit maps to [`FailureReason::Engine`] with the head of stderr.
pub fn run<I, S>(program: &str, args: I, stdin: Option<&[u8]>) -> Result<Vec<u8>, FailureReason>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_until(program, args, stdin, current_deadline())
}

/// [`run`] with an explicit deadline. The child is killed and reaped when
/// it is still running at `deadline`.
pub fn run_until<I, S>(
    program: &str,
    args: I,
    stdin: Option<&[u8]>,
    deadline: Option<Instant>,
) -> Result<Vec<u8>, FailureReason>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let started = Instant::now();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|err| spawn_failure(program, err))?;

    // Feed and drain on side threads so a chatty or stalled child cannot
    // block us past the deadline.
    let feeder = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => {
            let input = input.to_vec();
            Some(thread::spawn(move || pipe.write_all(&input)))
        }
        _ => None,
    };
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = match wait_until(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => {
            terminate(&mut child, program);
            let after_ms = started.elapsed().as_millis() as u64;
            warn!(program, after_ms, "Tool killed at deadline");
            return Err(FailureReason::Timeout { after_ms });
        }
        Err(err) => {
            terminate(&mut child, program);
            return Err(FailureReason::Io(format!("waiting for {program}: {err}")));
        }
    };

    // A child may exit without reading all of its input; that is its call.
    if let Some(Ok(Err(err))) = feeder.map(JoinHandle::join) {
        if err.kind() != ErrorKind::BrokenPipe {
            return Err(FailureReason::Io(format!("writing to {program}: {err}")));
        }
    }
    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
        return Err(FailureReason::Engine(format!(
            "{program} exited with {status}: {excerpt}"
        )));
    }

    debug!(program, stdout_len = stdout.len(), "Tool finished");
    Ok(stdout)
}

/// Wait for exit. `Ok(None)` means the deadline passed first.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill and reap, so no zombie outlives the call.
fn terminate(child: &mut Child, program: &str) {
    if let Err(err) = child.kill() {
        debug!(program, error = %err, "Kill failed; child already exited");
    }
    if let Err(err) = child.wait() {
        warn!(program, error = %err, "Could not reap tool process");
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn spawn_failure(program: &str, err: io::Error) -> FailureReason {
    if err.kind() == ErrorKind::NotFound {
        FailureReason::Unavailable(format!("{program} is not installed or not on PATH"))
    } else {
        FailureReason::Io(format!("cannot start {program}: {err}"))
    }
}
