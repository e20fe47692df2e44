use std::{
    collections::HashSet,
    io,
    os::unix::process::CommandExt as _,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use nix::{
    sys::signal::{killpg, Signal},
    unistd::Pid,
};
use tokio::{io::AsyncReadExt as _, io::AsyncWriteExt as _, process::Command};

const MEGABYTE_IN_KB: f64 = 1024.0;

/// Process groups currently running on behalf of one test run.
/// Cloning yields another handle to the same set, so an interrupt handler can
/// hold one while the runner holds the other.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    groups: Arc<Mutex<HashSet<i32>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<i32>> {
        // a panic while holding the lock cannot leave the set half-updated
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, pgid: i32) {
        self.lock().insert(pgid);
    }

    pub fn unregister(&self, pgid: i32) {
        self.lock().remove(&pgid);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sends SIGKILL to every registered process group. Returns how many
    /// groups were signalled successfully.
    pub fn kill_all(&self) -> usize {
        let groups: Vec<i32> = self.lock().drain().collect();
        groups
            .into_iter()
            .filter(|&pgid| match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Failed to kill process group {}: {}", pgid, e);
                    false
                }
            })
            .count()
    }

    fn guard(&self, pgid: i32) -> RegisteredGroup<'_> {
        self.register(pgid);
        RegisteredGroup {
            registry: self,
            pgid,
        }
    }
}

struct RegisteredGroup<'r> {
    registry: &'r ProcessRegistry,
    pgid: i32,
}

impl Drop for RegisteredGroup<'_> {
    fn drop(&mut self) {
        self.registry.unregister(self.pgid);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub exit_status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
    pub resident_memory_mb: f64,
}

impl ExecutionResult {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Cannot split command '{0}' into words: {1}")]
    InvalidCommand(String, #[source] shell_words::ParseError),

    #[error("Failed to spawn '{0}': {1}")]
    Spawn(String, #[source] io::Error),

    #[error("Failed to communicate with subprocess: {0}")]
    Communicate(#[source] io::Error),
}

/// Splits `cmd` with shell-word rules into program and arguments.
pub fn split_command(cmd: &str) -> Result<(String, Vec<String>), ExecError> {
    let mut words = shell_words::split(cmd)
        .map_err(|e| ExecError::InvalidCommand(cmd.to_owned(), e))?
        .into_iter();
    let program = words.next().ok_or(ExecError::EmptyCommand)?;
    Ok((program, words.collect()))
}

/// Resident set size of `pid` in megabytes, read from procfs.
fn resident_memory_mb(pid: u32) -> Option<f64> {
    let status = fsutil::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    let kb: f64 = status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))?
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    Some(kb / MEGABYTE_IN_KB)
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command_line: String,
    program: String,
    args: Vec<String>,
    work_dir: Option<PathBuf>,
    registry: ProcessRegistry,
}

impl ProcessRunner {
    /// Argument appended after the configured command, telling the program to read stdin.
    pub const STDIN_ARG: &str = "-";

    pub fn new(command_line: &str, registry: ProcessRegistry) -> Result<Self, ExecError> {
        let (program, args) = split_command(command_line)?;
        Ok(Self {
            command_line: command_line.to_owned(),
            program,
            args,
            work_dir: None,
            registry,
        })
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn get_command_line(&self) -> &str {
        &self.command_line
    }

    pub fn get_work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    fn build_command(&self) -> Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg(Self::STDIN_ARG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        let mut cmd = Command::from(cmd);
        cmd.kill_on_drop(true);
        cmd
    }

    /// Runs the command once, feeding `input` to its stdin and collecting
    /// everything it writes until it exits.
    pub async fn run(&self, input: &[u8]) -> Result<ExecutionResult, ExecError> {
        let mut child = self
            .build_command()
            .spawn()
            .map_err(|e| ExecError::Spawn(self.command_line.clone(), e))?;

        // process_group(0) makes the child the leader: pgid == pid
        let pgid = child.id().map(|pid| pid as i32);
        let _registered = pgid.map(|pgid| self.registry.guard(pgid));
        let resident_memory_mb = child
            .id()
            .and_then(resident_memory_mb)
            .unwrap_or(0.0);

        let mut stdin = child.stdin.take().ok_or_else(|| {
            ExecError::Communicate(io::Error::new(io::ErrorKind::Other, "Failed to open stdin"))
        })?;
        let mut stdout = child.stdout.take().ok_or_else(|| {
            ExecError::Communicate(io::Error::new(io::ErrorKind::Other, "Failed to open stdout"))
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            ExecError::Communicate(io::Error::new(io::ErrorKind::Other, "Failed to open stderr"))
        })?;

        let start_at = Instant::now();

        let feed_stdin = async move {
            match stdin.write_all(input).await {
                // the program may exit without reading its input
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                res => res,
            }
            // stdin is dropped here so the child sees EOF
        };

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let (_, _, _, exit_status) = tokio::try_join!(
            feed_stdin,
            stdout.read_to_end(&mut stdout_buf),
            stderr.read_to_end(&mut stderr_buf),
            child.wait(),
        )
        .map_err(ExecError::Communicate)?;

        let elapsed = start_at.elapsed();

        Ok(ExecutionResult {
            exit_status,
            stdout: stdout_buf,
            stderr: stderr_buf,
            elapsed,
            resident_memory_mb,
        })
    }
}
