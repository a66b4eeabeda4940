//! Command execution seam and result classification

use crate::error::RemoteExecError;

/// Exit code ssh reports when the connection was refused, dropped or
/// could not be established.
pub const SSH_CONNECTION_EXIT_CODE: i32 = 255;

/// Captured result of one remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the local transport was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run printing `stdout`
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A run that exited with `code` and printed `stderr`
    pub fn exited(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// ssh could not reach the host (or lost it mid-command)
    pub fn connection_lost() -> Self {
        Self::exited(SSH_CONNECTION_EXIT_CODE, "Connection closed by remote host")
    }

    /// stderr followed by stdout, trimmed
    pub fn combined_output(&self) -> String {
        let mut output = self.stderr.trim().to_string();
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(stdout);
        }
        output
    }

    /// Classify the result of running `command` on `host`
    pub fn into_outcome(self, host: &str, command: &str) -> ExecOutcome {
        match self.exit_code {
            Some(0) => ExecOutcome::Success(self.stdout.trim().to_string()),
            Some(SSH_CONNECTION_EXIT_CODE) => ExecOutcome::Transient(format!(
                "connection to {host} lost running `{command}`: {}",
                self.combined_output()
            )),
            exit_code => ExecOutcome::Fatal(RemoteExecError::CommandFailed {
                host: host.to_string(),
                command: command.to_string(),
                exit_code,
                output: self.combined_output(),
            }),
        }
    }
}

/// Outcome of a remote command
///
/// Transient failures are the ones a retry loop exists to absorb; fatal ones
/// abort the current operation.
#[derive(Debug)]
pub enum ExecOutcome {
    /// Exit 0, with trimmed stdout
    Success(String),
    /// The transport dropped or was refused; safe to retry
    Transient(String),
    /// Any other failure
    Fatal(RemoteExecError),
}

/// Runs `argv` on `host` and captures its output
///
/// `Err` is reserved for failures to start the local transport at all; a
/// command that ran and failed is reported through [`CommandOutput::exit_code`].
#[async_trait::async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, host: &str, argv: &[&str]) -> Result<CommandOutput, RemoteExecError>;
}
