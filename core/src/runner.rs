//! Invocation of the external scanning engines.
//!
//! Stages describe *what* to run as an [`Invocation`] and hand it to a [`ToolRunner`].
//! [`ProcessRunner`] spawns real processes; tests plug in scripted runners that write
//! artifacts directly.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error};

/// A single command line for an external engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// File the engine is told to write its structured result to.
    pub artifact: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            artifact: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends `flag <path>` and remembers `path` as the artifact.
    pub fn write_to(mut self, flag: &str, path: &Path) -> Self {
        self.args.push(flag.into());
        self.args.push(path.as_os_str().to_owned());
        self.artifact = Some(path.to_path_buf());
        self
    }

    /// Human readable command line for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Exit {
        program: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("'{program}' did not finish within {}s", .after.as_secs_f64())]
    Timeout { program: String, after: Duration },

    #[error("cannot read artifact {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    /// Output captured before the failure, if any.
    pub fn captured(&self) -> Option<(&str, &str)> {
        match self {
            ToolError::Exit { stdout, stderr, .. } => Some((stdout, stderr)),
            _ => None,
        }
    }
}

/// Logs a failed invocation with everything the engine printed.
pub(crate) fn report_failure(tag: &str, subject: &str, artifact: &Path, error: &ToolError) {
    error!("{tag} {subject}: {error} [artifact: {}]", artifact.display());
    if let Some((stdout, stderr)) = error.captured() {
        if !stdout.trim().is_empty() {
            error!("{tag} {subject} stdout: {}", stdout.trim());
        }
        if !stderr.trim().is_empty() {
            error!("{tag} {subject} stderr: {}", stderr.trim());
        }
    }
}

pub(crate) fn report_output(tag: &str, subject: &str, output: &ToolOutput) {
    if !output.stdout.trim().is_empty() {
        debug!("{tag} {subject} stdout: {}", output.stdout.trim());
    }
    if !output.stderr.trim().is_empty() {
        debug!("{tag} {subject} stderr: {}", output.stderr.trim());
    }
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn execute(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;
}

/// Runs invocations as child processes of this one.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn execute(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let program: String = invocation.program.display().to_string();

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let finished = match self.timeout {
            Some(after) => tokio::time::timeout(after, command.output())
                .await
                .map_err(|_| ToolError::Timeout {
                    program: program.clone(),
                    after,
                })?,
            None => command.output().await,
        };

        let output = finished.map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout: String = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr: String = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ToolError::Exit {
                program,
                status: output.status.to_string(),
                stdout,
                stderr,
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Invocation {
        Invocation::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn write_to_records_artifact_and_args() {
        let path = Path::new("/tmp/scratch/discovery_abc");
        let inv = Invocation::new("masscan")
            .arg("10.0.0.5")
            .arg("--rate=2000")
            .arg("-p-")
            .write_to("-oL", path);

        assert_eq!(inv.artifact.as_deref(), Some(path));
        assert_eq!(
            inv.command_line(),
            "masscan 10.0.0.5 --rate=2000 -p- -oL /tmp/scratch/discovery_abc"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_of_successful_run() {
        let runner = ProcessRunner::default();
        let output = runner
            .execute(&shell("echo found; echo noise >&2"))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "found");
        assert_eq!(output.stderr.trim(), "noise");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_keeps_captured_output() {
        let runner = ProcessRunner::default();
        let err = runner
            .execute(&shell("echo partial; echo 'permission denied' >&2; exit 3"))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Exit { .. }));
        let (stdout, stderr) = err.captured().unwrap();
        assert_eq!(stdout.trim(), "partial");
        assert_eq!(stderr.trim(), "permission denied");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let runner = ProcessRunner::default();
        let err = runner
            .execute(&Invocation::new("/nonexistent/relayscan-engine"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert!(err.captured().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_invocation_times_out() {
        let runner = ProcessRunner::new(Some(Duration::from_millis(100)));
        let err = runner.execute(&shell("sleep 5")).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }
}
