//! Execution of generated statements.
//!
//! - [`ScriptExecutor::execute`] pipes the script into `bash -s` with `set -e`
//!   (and `set -x` when verbose) prepended.
//! - [`ScriptExecutor::invoke`] runs an external executable, passing the artifact
//!   path in `DOCKWALL_RULES` or the script on stdin when there is no artifact.
//!
//! Both report the child's combined output; a non-zero exit is an execution error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::CliError;

/// Environment variable carrying the artifact path to invoked executables.
pub const RULES_ENV_VAR: &str = "DOCKWALL_RULES";

const DEFAULT_SHELL: &str = "/bin/bash";

/// Captured result of a successful child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// stdout followed by stderr
    pub combined: String,
}

/// Runs generated statements through a shell or hands them to an executable.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    shell: PathBuf,
    verbose: bool,
}

impl Default for ScriptExecutor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ScriptExecutor {
    pub fn new(verbose: bool) -> Self {
        Self {
            shell: PathBuf::from(DEFAULT_SHELL),
            verbose,
        }
    }

    /// Uses a different shell binary (must accept `-s`).
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Shell preamble written before the script.
    pub fn preamble(&self) -> &'static str {
        if self.verbose {
            "set -e\nset -x\n"
        } else {
            "set -e\n"
        }
    }

    /// Executes `script` with the shell.
    ///
    /// # Errors
    ///
    /// `CliError::Execution` if the shell cannot be spawned or exits non-zero;
    /// the message includes the combined output.
    pub async fn execute(&self, script: &str) -> Result<ExecOutput, CliError> {
        info!(shell = %self.shell.display(), "executing generated statements");

        let mut command = Command::new(&self.shell);
        command.arg("-s");
        let input = format!("{}{}", self.preamble(), script);

        run(command, Some(input), &self.shell).await
    }

    /// Invokes `executable`.
    ///
    /// With an artifact path the child gets it in [`RULES_ENV_VAR`] and no stdin;
    /// otherwise the script is written to its stdin.
    pub async fn invoke(
        &self,
        executable: &Path,
        artifact: Option<&Path>,
        script: &str,
    ) -> Result<ExecOutput, CliError> {
        info!(executable = %executable.display(), "invoking executable");

        let mut command = Command::new(executable);
        let input = match artifact {
            Some(path) => {
                command.env(RULES_ENV_VAR, path);
                None
            }
            None => Some(script.to_owned()),
        };

        run(command, input, executable).await
    }
}

async fn run(
    mut command: Command,
    input: Option<String>,
    program: &Path,
) -> Result<ExecOutput, CliError> {
    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        CliError::Execution(format!("failed to spawn {}: {e}", program.display()))
    })?;

    // Feed stdin concurrently with draining stdout/stderr.
    let writer = match (input, child.stdin.take()) {
        (Some(input), Some(mut stdin)) => Some(tokio::spawn(async move {
            let result = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            match result {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        })),
        _ => None,
    };

    let output = child.wait_with_output().await.map_err(|e| {
        CliError::Execution(format!("failed to wait for {}: {e}", program.display()))
    })?;

    if let Some(writer) = writer {
        writer
            .await
            .map_err(std::io::Error::other)?
            .map_err(|e| {
                CliError::Execution(format!("failed to write stdin of {}: {e}", program.display()))
            })?;
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    check_status(output.status, program, &combined)?;
    debug!(program = %program.display(), bytes = combined.len(), "child finished");

    Ok(ExecOutput { combined })
}

fn check_status(status: ExitStatus, program: &Path, combined: &str) -> Result<(), CliError> {
    if status.success() {
        return Ok(());
    }
    let mut message = format!("{} exited with {status}", program.display());
    let trimmed = combined.trim_end();
    if !trimmed.is_empty() {
        message.push_str(":\n");
        message.push_str(trimmed);
    }
    Err(CliError::Execution(message))
}
