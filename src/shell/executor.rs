//! Shell-backed pre-install execution.
//!
//! [`ShellExecutor`] runs a recipe's discovery script as `<shell> -c
//! <script>` after substituting recipe variables. The child runs in its own
//! process group. Once the script exits, times out, or is cancelled, the
//! whole group is killed so nothing the script started outlives it.
//!
//! Scripts report structured detail through a side-channel file whose path
//! is exported as [`OUTPUT_FILE_ENV`]:
//!
//! ```sh
//! echo '{"metadata": {"reason": "unsupported-os"}}' > "$RECIPE_OUTPUT_FILE"
//! exit 132
//! ```

use crate::cancel::CancelToken;
use crate::filter::{ExecutionError, PreInstallExecutor};
use crate::recipe::{render_script, Recipe, RecipeVars};
use crate::status::Metadata;
use serde_json::Value;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// Environment variable holding the path of the metadata output file.
pub const OUTPUT_FILE_ENV: &str = "RECIPE_OUTPUT_FILE";

/// Default per-script timeout.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Bytes of stdout and stderr kept per script. Older output is dropped.
pub const MAX_CAPTURE_BYTES: usize = 64 * 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long output readers may run after the process group is killed.
const READER_GRACE: Duration = Duration::from_millis(500);

/// Runs pre-install scripts under a shell.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    timeout: Duration,
    cwd: Option<PathBuf>,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(default_shell())
    }
}

impl ShellExecutor {
    /// Create an executor using `shell` with the default timeout.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            timeout: DEFAULT_SCRIPT_TIMEOUT,
            cwd: None,
        }
    }

    /// Set the per-script timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run scripts from `cwd` instead of the current directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_command(&self, script: &str, vars: &RecipeVars, output_file: &Path) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(shell_flag(&self.shell));
        cmd.arg(script);

        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in vars {
            cmd.env(key, value);
        }
        cmd.env(OUTPUT_FILE_ENV, output_file);

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }
}

impl PreInstallExecutor for ShellExecutor {
    fn execute_pre_install(
        &self,
        cancel: &CancelToken,
        recipe: &Recipe,
        vars: &RecipeVars,
    ) -> Result<(), ExecutionError> {
        let Some(script) = recipe.discovery_script() else {
            return Ok(());
        };

        if cancel.is_cancelled() {
            return Err(ExecutionError::cancelled());
        }

        let script = render_script(script, vars);
        let output_file = tempfile::NamedTempFile::new()
            .map_err(|e| ExecutionError::launch(format!("failed to create output file: {}", e)))?;

        let start = Instant::now();
        let mut child = self
            .build_command(&script, vars, output_file.path())
            .spawn()
            .map_err(|e| ExecutionError::launch(format!("failed to launch {}: {}", self.shell, e)))?;

        tracing::debug!(
            "Running pre-install script for {} (pid {})",
            recipe.id,
            child.id()
        );

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let waited = wait_for_exit(&mut child, start + self.timeout, cancel);
        match waited {
            // Background children may still hold the output pipes.
            Ok(Waited::Exited(_)) => kill_group(child.id()),
            _ => terminate(&mut child),
        }

        let collect_until = Instant::now() + READER_GRACE;
        let stdout = collect_reader(stdout, collect_until);
        let stderr = collect_reader(stderr, collect_until);

        tracing::trace!(
            "Pre-install script for {} finished in {:?}",
            recipe.id,
            start.elapsed()
        );
        if !stdout.is_empty() {
            tracing::trace!("stdout: {}", stdout.trim_end());
        }

        let status = match waited {
            Ok(Waited::Exited(status)) => status,
            Ok(Waited::TimedOut) => {
                return Err(ExecutionError::timed_out(self.timeout).with_stderr(stderr));
            }
            Ok(Waited::Cancelled) => {
                return Err(ExecutionError::cancelled().with_stderr(stderr));
            }
            Err(e) => {
                return Err(ExecutionError::launch(format!(
                    "failed to wait for pre-install script: {}",
                    e
                ))
                .with_stderr(stderr));
            }
        };

        if status.success() {
            return Ok(());
        }

        let err = match status.code() {
            Some(code) => ExecutionError::exited(code, format!("exit status {}", code)),
            None => ExecutionError::signalled(describe_signal(&status)),
        };
        let err = err.with_stderr(stderr);

        match read_metadata(output_file.path()) {
            Some(metadata) => Err(err.with_metadata(metadata)),
            None => Err(err),
        }
    }
}

enum Waited {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

fn wait_for_exit(
    child: &mut Child,
    deadline: Instant,
    cancel: &CancelToken,
) -> std::io::Result<Waited> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Waited::Exited(status));
        }
        if cancel.is_cancelled() {
            return Ok(Waited::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(Waited::TimedOut);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill every process in the group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    if let Ok(pgid) = libc::pid_t::try_from(pid) {
        // SAFETY: killpg only sends a signal; the group was created for this child
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// Kill the child's process group and reap it.
fn terminate(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
    let mut pipe = pipe?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(read_tail(&mut pipe, MAX_CAPTURE_BYTES));
    });
    Some(rx)
}

/// Read `pipe` to the end, keeping at most the last `limit` bytes.
fn read_tail<R: Read>(pipe: &mut R, limit: usize) -> String {
    let mut captured = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                captured.extend_from_slice(&chunk[..n]);
                if captured.len() > limit {
                    let excess = captured.len() - limit;
                    captured.drain(..excess);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&captured).into_owned()
}

/// Wait for a reader until `until`. A reader still blocked after that
/// (a process that left the group holding the pipe) is abandoned.
fn collect_reader(reader: Option<Receiver<String>>, until: Instant) -> String {
    let Some(reader) = reader else {
        return String::new();
    };
    let wait = until.saturating_duration_since(Instant::now());
    reader.recv_timeout(wait).unwrap_or_default()
}

/// Read structured metadata from the side-channel file.
///
/// A JSON object's `"metadata"` member is used when it is itself an object;
/// otherwise the whole object is the metadata.
fn read_metadata(path: &Path) -> Option<Metadata> {
    let content = std::fs::read_to_string(path).ok()?;
    if content.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(mut object)) => match object.remove("metadata") {
            Some(Value::Object(metadata)) => Some(metadata),
            Some(other) => {
                object.insert("metadata".to_string(), other);
                Some(object)
            }
            None => Some(object),
        },
        Ok(_) => {
            tracing::debug!("Ignoring non-object script output in {}", path.display());
            None
        }
        Err(e) => {
            tracing::debug!("Ignoring unparseable script output: {}", e);
            None
        }
    }
}

#[cfg(unix)]
fn describe_signal(status: &ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("killed by signal {}", signal),
        None => "terminated without an exit status".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal(_status: &ExitStatus) -> String {
    "terminated without an exit status".to_string()
}

/// Shell used when none is configured.
pub fn default_shell() -> String {
    if cfg!(target_os = "windows") {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else {
        "/bin/sh".to_string()
    }
}

fn shell_flag(shell: &str) -> &'static str {
    let name = Path::new(shell)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match name.as_str() {
        "cmd" => "/C",
        "powershell" | "pwsh" => "-Command",
        _ => "-c",
    }
}
