//! Child process supervision
//!
//! Runs one child to completion while forwarding its stdout/stderr to our
//! own stdout/stderr as it arrives. Only a bounded tail of the output is
//! kept. On unix the child leads its own process group so a timeout takes
//! its descendants down with it.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Time allowed for output forwarders to drain after the child is gone
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Read size for output forwarding
const CHUNK_SIZE: usize = 8 * 1024;

/// Tail lines are cut to this many bytes
const MAX_TAIL_LINE: usize = 4 * 1024;

/// How the child ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessExit {
    /// Exited on its own; `None` when terminated by a signal
    Exited(Option<i32>),
    /// Could not be started (binary missing, permission denied, ...)
    SpawnFailed(String),
    /// Killed after exceeding the wall-clock limit
    TimedOut(Duration),
    /// Waiting on the child failed
    WaitFailed(String),
}

/// Structured result of a supervised run
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub exit: ProcessExit,
    /// Last lines of combined output, oldest first
    pub tail: Vec<String>,
    pub duration_ms: u64,
}

/// Output forwarding options
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Prefix put in front of every forwarded line
    pub label: Option<String>,
    /// Number of lines kept in [`ProcessReport::tail`]
    pub tail_lines: usize,
    /// Kill the child after this long
    pub timeout: Option<Duration>,
}

#[derive(Clone, Copy)]
enum Sink {
    Stdout,
    Stderr,
}

impl Sink {
    async fn write(self, bytes: &[u8]) {
        let written = match self {
            Sink::Stdout => {
                let mut out = tokio::io::stdout();
                out.write_all(bytes).await.and(out.flush().await)
            }
            Sink::Stderr => {
                let mut err = tokio::io::stderr();
                err.write_all(bytes).await.and(err.flush().await)
            }
        };
        if let Err(e) = written {
            tracing::debug!(error = %e, "Failed to forward runner output");
        }
    }
}

type Tail = Arc<Mutex<VecDeque<String>>>;

fn push_tail(tail: &Tail, line: String, limit: usize) {
    if limit == 0 {
        return;
    }
    if let Ok(mut tail) = tail.lock() {
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }
}

/// Splits a byte stream into tail lines on `\n` or `\r`
///
/// Holds at most [`MAX_TAIL_LINE`] bytes of the current line; the rest of an
/// overlong line is dropped. Empty lines are skipped.
#[derive(Default)]
struct TailLines {
    pending: Vec<u8>,
}

impl TailLines {
    fn feed(&mut self, data: &[u8], mut emit: impl FnMut(String)) {
        for &byte in data {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take() {
                    emit(line);
                }
            } else if self.pending.len() < MAX_TAIL_LINE {
                self.pending.push(byte);
            }
        }
    }

    fn take(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

/// Put `label` in front of every line starting inside `data`
fn prefix_lines<'a>(data: &'a [u8], label: Option<&str>, at_line_start: &mut bool) -> Cow<'a, [u8]> {
    let Some(label) = label else {
        if let Some(&last) = data.last() {
            *at_line_start = last == b'\n';
        }
        return Cow::Borrowed(data);
    };
    let mut out = Vec::with_capacity(data.len() + label.len() + 1);
    for piece in data.split_inclusive(|b| *b == b'\n') {
        if *at_line_start {
            out.extend_from_slice(label.as_bytes());
            out.push(b' ');
        }
        out.extend_from_slice(piece);
        *at_line_start = piece.ends_with(b"\n");
    }
    Cow::Owned(out)
}

fn forward<R>(mut reader: R, sink: Sink, label: Option<String>, tail: Tail, limit: usize) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut lines = TailLines::default();
        let mut at_line_start = true;
        loop {
            let n = match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(error = %e, "Runner output stream closed");
                    break;
                }
            };
            let data = &chunk[..n];

            sink.write(&prefix_lines(data, label.as_deref(), &mut at_line_start))
                .await;
            lines.feed(data, |line| push_tail(&tail, line, limit));
        }

        if !at_line_start {
            sink.write(b"\n").await;
        }
        if let Some(line) = lines.take() {
            push_tail(&tail, line, limit);
        }
    })
}

/// Kill the child and, on unix, every process in its group
async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
            // The child leads its own group, so its pid is the group id.
            let rc = unsafe { libc::killpg(pid, libc::SIGKILL) };
            if rc != 0 {
                tracing::debug!(
                    pid,
                    error = %std::io::Error::last_os_error(),
                    "Failed to kill runner process group"
                );
            }
        }
    }
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill timed out runner");
    }
}

/// Spawn `command` and wait for it, streaming its output
///
/// Never fails: spawn and wait problems are reported through
/// [`ProcessExit`].
pub async fn supervise(mut command: Command, options: &StreamOptions) -> ProcessReport {
    let start = Instant::now();
    let elapsed_ms = |start: Instant| start.elapsed().as_millis() as u64;

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ProcessReport {
                exit: ProcessExit::SpawnFailed(e.to_string()),
                tail: Vec::new(),
                duration_ms: elapsed_ms(start),
            };
        }
    };

    let tail: Tail = Arc::new(Mutex::new(VecDeque::with_capacity(options.tail_lines)));
    let mut forwarders = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        forwarders.push(forward(
            stdout,
            Sink::Stdout,
            options.label.clone(),
            Arc::clone(&tail),
            options.tail_lines,
        ));
    }
    if let Some(stderr) = child.stderr.take() {
        forwarders.push(forward(
            stderr,
            Sink::Stderr,
            options.label.clone(),
            Arc::clone(&tail),
            options.tail_lines,
        ));
    }

    let exit = match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(Ok(status)) => ProcessExit::Exited(status.code()),
            Ok(Err(e)) => ProcessExit::WaitFailed(e.to_string()),
            Err(_) => {
                kill_tree(&mut child).await;
                ProcessExit::TimedOut(limit)
            }
        },
        None => match child.wait().await {
            Ok(status) => ProcessExit::Exited(status.code()),
            Err(e) => ProcessExit::WaitFailed(e.to_string()),
        },
    };

    // Grandchildren can keep the pipes open after the child is gone.
    for handle in forwarders {
        let abort = handle.abort_handle();
        if tokio::time::timeout(DRAIN_TIMEOUT, handle).await.is_err() {
            abort.abort();
        }
    }

    let tail = tail
        .lock()
        .map(|t| t.iter().cloned().collect())
        .unwrap_or_default();

    ProcessReport {
        exit,
        tail,
        duration_ms: elapsed_ms(start),
    }
}
