// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process with interleaved stdout/stderr capture.
//!
//! One reader task per stream appends complete lines to a shared log under a
//! mutex, so records land in the order they were read. Each record carries
//! the delay since the previous record of either stream. Lines are raw bytes
//! with their trailing newline; nothing is decoded.

use crate::controller::CommandSpec;
use crate::executor::ExecError;
use ck_core::{delay_secs, Clock, IoLogRecord, IoStream, JobId};
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How long readers may keep going after the job exits. A background
/// process that inherited the pipes would otherwise hold them open forever.
const READER_GRACE: Duration = Duration::from_secs(5);

pub(crate) struct Captured {
    pub status: ExitStatus,
    pub io_log: Vec<IoLogRecord>,
    pub aborted: bool,
}

impl Captured {
    /// Exit code, or the negated signal number when killed by a signal.
    pub fn return_code(&self) -> i32 {
        self.status.code().or_else(|| self.status.signal().map(|s| -s)).unwrap_or(-1)
    }
}

/// Plain-file copies of a job's output under the session's io-log directory.
#[derive(Default)]
pub(crate) struct Mirror {
    stdout: Option<File>,
    stderr: Option<File>,
}

impl Mirror {
    pub fn open(dir: Option<&Path>, job: &JobId) -> Self {
        let Some(dir) = dir else { return Self::default() };
        let slug = slug(job);
        let open = |ext: &str| {
            let path = dir.join(format!("{slug}.{ext}"));
            File::create(&path)
                .map_err(|e| warn!(path = %path.display(), error = %e, "cannot create io-log mirror"))
                .ok()
        };
        Self { stdout: open("stdout"), stderr: open("stderr") }
    }

    fn write(&mut self, stream: IoStream, data: &[u8]) {
        let file = match stream {
            IoStream::Stdout => &mut self.stdout,
            IoStream::Stderr => &mut self.stderr,
        };
        if let Some(f) = file {
            if let Err(e) = f.write_all(data) {
                warn!(%stream, error = %e, "io-log mirror write failed; disabling");
                *file = None;
            }
        }
    }
}

/// File-name safe form of a job id.
pub(crate) fn slug(job: &JobId) -> String {
    job.chars().map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' }).collect()
}

struct CaptureLog<C: Clock> {
    clock: C,
    last: Instant,
    records: Vec<IoLogRecord>,
    mirror: Mirror,
}

impl<C: Clock> CaptureLog<C> {
    fn push(&mut self, stream: IoStream, data: Vec<u8>) {
        let now = self.clock.now();
        let delay = delay_secs(self.last, now);
        self.last = now;
        self.mirror.write(stream, &data);
        self.records.push(IoLogRecord { delay, stream, data });
    }
}

pub(crate) async fn run_captured<C: Clock>(
    spec: &CommandSpec,
    cwd: &Path,
    clock: C,
    mirror: Mirror,
    cancel: &CancellationToken,
) -> Result<Captured, ExecError> {
    let mut cmd = spec.to_command();
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    let mut child = cmd.spawn().map_err(ExecError::Spawn)?;
    let pid = child.id();

    let log = Arc::new(Mutex::new(CaptureLog { last: clock.now(), clock, records: Vec::new(), mirror }));
    let mut readers = Vec::new();
    if let Some(out) = child.stdout.take() {
        readers.push(tokio::spawn(read_lines(out, IoStream::Stdout, Arc::clone(&log))));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(tokio::spawn(read_lines(err, IoStream::Stderr, Arc::clone(&log))));
    }

    let finished = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    let (status, aborted) = match finished {
        Some(status) => (status?, false),
        None => {
            kill_group(pid);
            (child.wait().await?, true)
        }
    };

    for mut reader in readers {
        if tokio::time::timeout(READER_GRACE, &mut reader).await.is_err() {
            warn!("output still open after the job exited; dropping the rest");
            reader.abort();
        }
    }

    let io_log = std::mem::take(&mut log.lock().records);
    Ok(Captured { status, io_log, aborted })
}

async fn read_lines<R, C>(pipe: R, stream: IoStream, log: Arc<Mutex<CaptureLog<C>>>)
where
    R: AsyncRead + Unpin,
    C: Clock,
{
    let mut reader = BufReader::new(pipe);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => log.lock().push(stream, line),
            Err(e) => {
                warn!(%stream, error = %e, "reading job output failed");
                break;
            }
        }
    }
}

/// SIGKILL the whole process group led by `pid`.
fn kill_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    let pgid = nix::unistd::Pid::from_raw(pid as i32);
    if let Err(e) = nix::sys::signal::killpg(pgid, nix::sys::signal::Signal::SIGKILL) {
        warn!(pid, error = %e, "killpg failed");
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
