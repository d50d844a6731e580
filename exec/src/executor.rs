//! Process execution seam.
//!
//! [`CommandExecutor`] is the one place where the crate touches child
//! processes. [`ProcessExecutor`] spawns the real binary; tests plug in a
//! scripted executor instead.

use std::io::{ErrorKind, PipeReader, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::{ExecError, Result};

/// A fully resolved child invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    /// Added on top of the parent's environment, in order.
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            ..Self::default()
        }
    }

    /// Program and arguments as one space-joined line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a child left behind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    /// Interleaved stdout and stderr.
    pub output: Vec<u8>,
    /// `None` when the child was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl Completion {
    pub fn exited(exit_code: i32, output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(exit_code),
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs invocations. Implementations must be shareable across threads so one
/// executor can back several runners.
pub trait CommandExecutor: Send + Sync {
    /// Runs `invocation` to completion (or timeout).
    ///
    /// A child that starts and exits unsuccessfully is still `Ok`; only a
    /// failure to start or to collect output is an error.
    fn execute(&self, invocation: &Invocation) -> Result<Completion>;

    /// Runs `stages` as a pipeline where each stage's stdout feeds the next
    /// stage's stdin.
    ///
    /// The completion carries the stderr of every stage plus the stdout of
    /// the last one. Its exit code is that of the first stage that failed,
    /// or the last stage's when all succeed. The first stage's timeout bounds
    /// the whole pipeline.
    fn execute_pipeline(&self, stages: &[Invocation]) -> Result<Completion> {
        match stages {
            [single] => self.execute(single),
            _ => Err(ExecError::Unsupported("command pipelines".to_string())),
        }
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Arc<E> {
    fn execute(&self, invocation: &Invocation) -> Result<Completion> {
        (**self).execute(invocation)
    }

    fn execute_pipeline(&self, stages: &[Invocation]) -> Result<Completion> {
        (**self).execute_pipeline(stages)
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Box<E> {
    fn execute(&self, invocation: &Invocation) -> Result<Completion> {
        (**self).execute(invocation)
    }

    fn execute_pipeline(&self, stages: &[Invocation]) -> Result<Completion> {
        (**self).execute_pipeline(stages)
    }
}

/// How long to keep reading after the child is gone. A grandchild that
/// inherited the pipe can hold it open well past that point.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Spawns real child processes.
///
/// Stdout and stderr share one pipe, so the captured bytes keep the order in
/// which the CLI wrote its log lines and its body. On unix the child leads its
/// own process group, and a timeout kills the whole group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl CommandExecutor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<Completion> {
        let (reader, writer) = std::io::pipe()?;
        let mut command = command_for(invocation, None);
        command
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);

        let mut child = spawn(&mut command, invocation)?;
        // The command still owns both write ends; dropping it lets the reader
        // see EOF once every holder of the pipe exits.
        drop(command);

        let drain = Drain::start(reader);
        let deadline = invocation.timeout.map(|timeout| Instant::now() + timeout);
        let (exit_code, timed_out) = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => (status.code(), false),
            Ok(None) => {
                debug!(command = %invocation.command_line(), timeout = ?invocation.timeout, "Killing timed out child");
                kill_tree(&mut child);
                (None, true)
            }
            Err(err) => {
                kill_tree(&mut child);
                return Err(err.into());
            }
        };

        Ok(Completion {
            output: drain.finish(&invocation.command_line(), deadline.is_some()),
            exit_code,
            timed_out,
        })
    }

    fn execute_pipeline(&self, stages: &[Invocation]) -> Result<Completion> {
        let Some(first) = stages.first() else {
            return Err(ExecError::NotFound("empty command pipeline".to_string()));
        };
        let command_line = stages
            .iter()
            .map(Invocation::command_line)
            .collect::<Vec<_>>()
            .join(" | ");

        let (reader, writer) = std::io::pipe()?;
        let mut children: Vec<Child> = Vec::with_capacity(stages.len());
        let mut upstream: Option<ChildStdout> = None;
        for (index, stage) in stages.iter().enumerate() {
            // Every stage joins the first stage's process group.
            let group = children.first().map(Child::id);
            let mut command = command_for(stage, group);
            match upstream.take() {
                Some(stdout) => command.stdin(stdout),
                None => command.stdin(Stdio::null()),
            };
            if index + 1 == stages.len() {
                command.stdout(writer.try_clone()?);
            } else {
                command.stdout(Stdio::piped());
            }
            command.stderr(writer.try_clone()?);

            let mut child = match spawn(&mut command, stage) {
                Ok(child) => child,
                Err(err) => {
                    children.iter_mut().for_each(kill_tree);
                    return Err(err);
                }
            };
            upstream = child.stdout.take();
            children.push(child);
        }
        drop(writer);

        let drain = Drain::start(reader);
        let deadline = first.timeout.map(|timeout| Instant::now() + timeout);
        let mut codes = Vec::with_capacity(children.len());
        let mut timed_out = false;
        let mut failure = None;
        for child in children.iter_mut() {
            match wait_until(child, deadline) {
                Ok(Some(status)) => codes.push(status.code()),
                Ok(None) => {
                    debug!(command = %command_line, timeout = ?first.timeout, "Killing timed out pipeline");
                    timed_out = true;
                    break;
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        if timed_out || failure.is_some() {
            children.iter_mut().for_each(kill_tree);
        }
        if let Some(err) = failure {
            return Err(err.into());
        }

        let exit_code = if timed_out {
            None
        } else {
            codes
                .iter()
                .copied()
                .find(|code| *code != Some(0))
                .unwrap_or(Some(0))
        };
        Ok(Completion {
            output: drain.finish(&command_line, deadline.is_some()),
            exit_code,
            timed_out,
        })
    }
}

/// A command for `invocation` with everything but its stdio wired up.
///
/// On unix the child leads a new process group, or joins `group` when given.
fn command_for(invocation: &Invocation, group: Option<u32>) -> Command {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args);
    if let Some(dir) = &invocation.dir {
        command.current_dir(dir);
    }
    for (key, value) in &invocation.env {
        command.env(key, value);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let pgid = group.and_then(|id| i32::try_from(id).ok()).unwrap_or(0);
        command.process_group(pgid);
    }
    #[cfg(not(unix))]
    let _ = group;
    command
}

fn spawn(command: &mut Command, invocation: &Invocation) -> Result<Child> {
    command.spawn().map_err(|source| ExecError::Spawn {
        program: invocation.program.clone(),
        source,
    })
}

/// Waits for `child`, giving up at `deadline`. `Ok(None)` means it is still
/// running.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<Option<ExitStatus>> {
    match deadline {
        Some(deadline) => child.wait_timeout(deadline.saturating_duration_since(Instant::now())),
        None => child.wait().map(Some),
    }
}

/// Background reader for the shared output pipe.
///
/// Draining keeps a chatty child from blocking on a full pipe buffer while we
/// wait for it. Chunks land in a shared buffer so a drain we stop waiting for
/// still leaves what it read.
struct Drain {
    captured: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<std::io::Result<()>>,
}

impl Drain {
    fn start(mut reader: PipeReader) -> Self {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done) = mpsc::channel();
        let sink = Arc::clone(&captured);
        std::thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            let result = loop {
                match reader.read(&mut chunk) {
                    Ok(0) => break Ok(()),
                    Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                    Err(err) if err.kind() == ErrorKind::Interrupted => {}
                    Err(err) => break Err(err),
                }
            };
            let _ = done_tx.send(result);
        });
        Self { captured, done }
    }

    /// Collects the output once the children are gone. With `bounded` set,
    /// waits at most [`DRAIN_GRACE`] for the pipe to close.
    fn finish(self, command_line: &str, bounded: bool) -> Vec<u8> {
        let drained = if bounded {
            self.done.recv_timeout(DRAIN_GRACE).ok()
        } else {
            self.done.recv().ok()
        };
        match drained {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                debug!(command = %command_line, error = %err, "Failed to read child output");
            }
            None => {
                warn!(command = %command_line, "Child output still open after exit; keeping what was read");
            }
        }
        std::mem::take(&mut *lock(&self.captured))
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Kills the child and everything in its process group, then reaps it.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;
        if let Ok(pgid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}
