//! SSH transport

use crate::error::RemoteExecError;
use crate::executor::{CommandOutput, RemoteExecutor};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs commands through the local `ssh` binary
///
/// Each call is `<program> <options..> <host> <argv..>`. Hosts are addressed
/// by name, so user, port and identity come from the operator's ssh config.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    program: String,
    options: Vec<String>,
}

impl SshExecutor {
    /// Non-interactive ssh with the given connect timeout
    #[must_use]
    pub fn new(connect_timeout: Duration) -> Self {
        Self::with_command(
            "ssh",
            vec![
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                "-o".to_string(),
                format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)),
            ],
        )
    }

    /// Use a custom transport program and leading options
    pub fn with_command(program: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            program: program.into(),
            options,
        }
    }

    /// Replace the transport program, keeping the options
    #[must_use]
    pub fn program_path(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Transport program
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait::async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, host: &str, argv: &[&str]) -> Result<CommandOutput, RemoteExecError> {
        debug!("Running on {}: {} {}", host, self.program, argv.join(" "));

        let output = Command::new(&self.program)
            .args(&self.options)
            .arg(host)
            .args(argv)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RemoteExecError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("{} on {} exited with {:?}", argv.join(" "), host, result.exit_code);
        Ok(result)
    }
}
