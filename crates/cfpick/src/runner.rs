use std::fmt;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::sanitize::clean_line;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long one wait on the output channel lasts before checking the child again.
const POLL_SLICE: Duration = Duration::from_millis(25);
/// Output still arriving after the child exited is collected for this long.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(200);

/// One external command: program, argument list and optional working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Reject argument lists that cannot be handed to the OS as-is.
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(Error::msg("empty program"));
        }
        if self.program.contains('\0') {
            return Err(Error::msg("program contains NUL"));
        }
        if let Some(i) = self.args.iter().position(|a| a.contains('\0')) {
            return Err(Error::msg(format!("argument {i} contains NUL")));
        }
        if let Some(dir) = self.cwd.as_deref()
            && !dir.is_dir()
        {
            return Err(Error::msg(format!(
                "working directory {} does not exist",
                dir.display()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for a in &self.args {
            if a.is_empty() || a.contains(char::is_whitespace) {
                write!(f, " '{a}'")?;
            } else {
                write!(f, " {a}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Exited(i32),
    /// Killed by a signal we did not send.
    Signalled,
    TimedOut,
    SpawnFailed(String),
    Malformed(String),
}

impl RunStatus {
    pub fn success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Exited(code) => write!(f, "exit {code}"),
            RunStatus::Signalled => write!(f, "killed by signal"),
            RunStatus::TimedOut => write!(f, "timed out"),
            RunStatus::SpawnFailed(e) => write!(f, "spawn failed: {e}"),
            RunStatus::Malformed(e) => write!(f, "malformed invocation: {e}"),
        }
    }
}

/// Captured result of one invocation.
///
/// `stdout` is empty unless the process exited with status 0. `stderr` is kept
/// whenever the process ran so callers can surface the CLI's own message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub status: RunStatus,
    pub elapsed: Duration,
}

impl RunOutput {
    pub fn empty(status: RunStatus) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            status,
            elapsed: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Short human-readable reason for a failed run, preferring the CLI's stderr.
    pub fn failure_reason(&self) -> String {
        match self.stderr.iter().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("{}: {}", self.status, line.trim()),
            None => self.status.to_string(),
        }
    }
}

pub trait CommandRunner {
    /// Run to completion (or timeout) with output captured.
    fn run(&self, inv: &Invocation) -> RunOutput;

    /// Run with the terminal attached and no timeout; used for streaming logs.
    fn attach(&self, inv: &Invocation) -> Result<RunStatus>;
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProcessRunner {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn resolve_cwd(inv: &Invocation) -> PathBuf {
        match inv.cwd.as_deref() {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl CommandRunner for ProcessRunner {
    fn run(&self, inv: &Invocation) -> RunOutput {
        if let Err(e) = inv.validate() {
            tracing::warn!(invocation = %inv, error = %e, "refusing malformed invocation");
            return RunOutput::empty(RunStatus::Malformed(e.to_string()));
        }
        let cwd = Self::resolve_cwd(inv);
        let started = Instant::now();
        let out = capture(inv, &cwd, self.timeout);
        let out = RunOutput {
            elapsed: started.elapsed(),
            ..out
        };
        match &out.status {
            RunStatus::Exited(0) => tracing::debug!(
                invocation = %inv,
                cwd = %cwd.display(),
                elapsed_ms = out.elapsed.as_millis() as u64,
                lines = out.stdout.len(),
                "command finished"
            ),
            status => tracing::warn!(
                invocation = %inv,
                cwd = %cwd.display(),
                elapsed_ms = out.elapsed.as_millis() as u64,
                %status,
                stderr = out.stderr.last().map(String::as_str).unwrap_or(""),
                "command failed"
            ),
        }
        out
    }

    fn attach(&self, inv: &Invocation) -> Result<RunStatus> {
        inv.validate()?;
        let cwd = Self::resolve_cwd(inv);
        tracing::info!(invocation = %inv, cwd = %cwd.display(), "attaching command");
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args)
            .current_dir(&cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Ctrl-C stops the child, not us: ignore SIGINT while it runs and
        // give the child the default disposition back.
        #[cfg(unix)]
        let previous = {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    libc::signal(libc::SIGINT, libc::SIG_DFL);
                    Ok(())
                });
                libc::signal(libc::SIGINT, libc::SIG_IGN)
            }
        };

        let status = cmd.status();

        #[cfg(unix)]
        unsafe {
            libc::signal(libc::SIGINT, previous);
        }

        let status =
            status.map_err(|e| Error::msg(format!("spawn {} failed: {e}", inv.program)))?;
        Ok(match status.code() {
            Some(code) => RunStatus::Exited(code),
            None => RunStatus::Signalled,
        })
    }
}

fn capture(inv: &Invocation, cwd: &Path, timeout: Duration) -> RunOutput {
    let mut cmd = Command::new(&inv.program);
    cmd.args(&inv.args).current_dir(cwd);

    // Own process group so a timeout can take down anything the CLI forked.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => return RunOutput::empty(RunStatus::SpawnFailed(e.to_string())),
    };
    let pgid = child.id();
    let deadline = Instant::now() + timeout;

    let (tx, rx) = mpsc::channel::<(Stream, String)>();
    if let Some(out) = child.stdout.take() {
        let tx = tx.clone();
        std::thread::spawn(move || read_lines(out, Stream::Stdout, tx));
    }
    if let Some(err) = child.stderr.take() {
        let tx = tx.clone();
        std::thread::spawn(move || read_lines(err, Stream::Stderr, tx));
    }
    drop(tx);

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut timed_out = false;
    let mut exit = None;
    // Set once the child has exited; a background grandchild may still hold
    // the pipes open, so lines are only drained until this instant.
    let mut drain_until: Option<Instant> = None;
    loop {
        let now = Instant::now();
        if let Some(until) = drain_until {
            if now >= until {
                break;
            }
        } else if now >= deadline {
            timed_out = true;
            break;
        }

        match rx.recv_timeout(POLL_SLICE) {
            Ok((Stream::Stdout, line)) => stdout.push(line),
            Ok((Stream::Stderr, line)) => stderr.push(line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) if exit.is_some() => break,
            Err(RecvTimeoutError::Disconnected) => std::thread::sleep(Duration::from_millis(10)),
        }

        if exit.is_none() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    exit = Some(status);
                    drain_until = Some(Instant::now() + EXIT_DRAIN_GRACE);
                }
                Ok(None) => {}
                Err(e) => return RunOutput::empty(RunStatus::SpawnFailed(e.to_string())),
            }
        }
    }

    if timed_out {
        kill_pgroup(pgid, false);
        std::thread::sleep(Duration::from_millis(50));
        kill_pgroup(pgid, true);
        let _ = child.kill();
        let _ = child.wait();
        return RunOutput {
            stdout: Vec::new(),
            stderr,
            status: RunStatus::TimedOut,
            elapsed: Duration::ZERO,
        };
    }

    let status = match exit.and_then(|s| s.code()) {
        Some(code) => RunStatus::Exited(code),
        None => RunStatus::Signalled,
    };
    if !status.success() {
        stdout.clear();
    }
    RunOutput {
        stdout,
        stderr,
        status,
        elapsed: Duration::ZERO,
    }
}

fn read_lines<R: Read>(reader: R, stream: Stream, tx: mpsc::Sender<(Stream, String)>) {
    const MAX_PENDING_BYTES: usize = 16 * 1024;
    let mut r = BufReader::new(reader);
    let mut buf = [0u8; 8192];
    let mut pending = Vec::with_capacity(1024);
    // An over-long line is sent once, truncated; the rest of it up to the
    // next newline is dropped.
    let mut skipping = false;

    let flush = |pending: &mut Vec<u8>| {
        let line = clean_line(&String::from_utf8_lossy(pending));
        pending.clear();
        tx.send((stream, line)).is_ok()
    };

    loop {
        let n = match r.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        for b in &buf[..n] {
            if *b == b'\n' {
                if skipping {
                    skipping = false;
                } else if !flush(&mut pending) {
                    return;
                }
            } else if !skipping {
                pending.push(*b);
                if pending.len() >= MAX_PENDING_BYTES {
                    // Do not cut a multi-byte char in half.
                    if let Err(e) = std::str::from_utf8(&pending)
                        && e.error_len().is_none()
                    {
                        pending.truncate(e.valid_up_to());
                    }
                    if !flush(&mut pending) {
                        return;
                    }
                    skipping = true;
                }
            }
        }
    }
    if !pending.is_empty() {
        flush(&mut pending);
    }
}

fn kill_pgroup(pgid: u32, force: bool) {
    #[cfg(unix)]
    {
        let sig = if force { libc::SIGKILL } else { libc::SIGTERM };
        // Negative pid signals the whole group.
        let _ = unsafe { libc::kill(-(pgid as i32), sig) };
    }
    #[cfg(not(unix))]
    {
        let _ = (pgid, force);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::{Duration, Instant};

    use std::io::Cursor;
    use std::sync::mpsc;

    use super::{CommandRunner, Invocation, ProcessRunner, RunStatus, Stream, read_lines};
    use crate::sanitize::MAX_LINE_CHARS;

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn stdout_and_stderr_are_collected_separately() {
        let out = ProcessRunner::default().run(&sh("echo one; echo two; echo oops >&2"));
        assert_eq!(out.status, RunStatus::Exited(0));
        assert_eq!(out.stdout, vec!["one", "two"]);
        assert_eq!(out.stderr, vec!["oops"]);
    }

    #[test]
    fn nonzero_exit_yields_empty_stdout() {
        let out = ProcessRunner::default().run(&sh("echo partial; echo bad >&2; exit 3"));
        assert_eq!(out.status, RunStatus::Exited(3));
        assert!(out.stdout.is_empty());
        assert_eq!(out.failure_reason(), "exit 3: bad");
    }

    #[test]
    fn malformed_invocation_is_not_spawned() {
        let out = ProcessRunner::default().run(&Invocation::new("  "));
        assert!(matches!(out.status, RunStatus::Malformed(_)));
        assert!(out.stdout.is_empty() && out.stderr.is_empty());

        let out = ProcessRunner::default().run(&Invocation::new("echo").arg("a\0b"));
        assert!(matches!(out.status, RunStatus::Malformed(_)));
    }

    #[test]
    fn missing_cwd_is_malformed() {
        let inv = Invocation::new("true").cwd("/definitely/not/here");
        let out = ProcessRunner::default().run(&inv);
        assert!(matches!(out.status, RunStatus::Malformed(_)));
    }

    #[test]
    fn missing_program_reports_spawn_failure() {
        let out = ProcessRunner::default().run(&Invocation::new("cfpick-no-such-binary"));
        assert!(matches!(out.status, RunStatus::SpawnFailed(_)));
    }

    #[test]
    fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = ProcessRunner::default().run(&Invocation::new("pwd").cwd(dir.path()));
        let expected = dir.path().canonicalize().unwrap();
        let got = std::path::PathBuf::from(&out.stdout[0]).canonicalize().unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn timeout_returns_promptly() {
        let runner = ProcessRunner::with_timeout(Duration::from_millis(300));
        let start = Instant::now();
        let out = runner.run(&sh("echo early; sleep 10"));
        assert_eq!(out.status, RunStatus::TimedOut);
        assert!(out.stdout.is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn exited_child_is_not_held_by_background_grandchild() {
        let runner = ProcessRunner::with_timeout(Duration::from_secs(2));
        let start = Instant::now();
        let out = runner.run(&sh("echo ok; sleep 5 &"));
        assert_eq!(out.status, RunStatus::Exited(0));
        assert_eq!(out.stdout, vec!["ok"]);
        assert!(start.elapsed() < Duration::from_secs(1), "took {:?}", start.elapsed());
    }

    fn lines_of(input: Vec<u8>) -> Vec<String> {
        let (tx, rx) = mpsc::channel();
        read_lines(Cursor::new(input), Stream::Stdout, tx);
        rx.into_iter().map(|(_, line)| line).collect()
    }

    #[test]
    fn over_long_line_stays_one_row() {
        let mut input = "x".repeat(20_000).into_bytes();
        input.extend_from_slice(b"\nnext\n");
        let got = lines_of(input);
        assert_eq!(got.len(), 2, "{:?}", got.iter().map(String::len).collect::<Vec<_>>());
        assert!(got[0].ends_with("...[truncated]"));
        assert_eq!(got[0].chars().filter(|c| *c == 'x').count(), MAX_LINE_CHARS);
        assert_eq!(got[1], "next");
    }

    #[test]
    fn over_long_line_is_not_cut_inside_a_char() {
        // One ASCII byte shifts the two-byte chars so the limit lands mid-char.
        let mut input = format!("a{}", "é".repeat(10_000)).into_bytes();
        input.push(b'\n');
        let got = lines_of(input);
        assert_eq!(got.len(), 1);
        assert!(!got[0].contains('\u{FFFD}'));
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let inv = Invocation::new("codefresh").args(["get", "builds", "a b"]);
        assert_eq!(inv.to_string(), "codefresh get builds 'a b'");
    }
}
