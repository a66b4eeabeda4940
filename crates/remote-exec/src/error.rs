//! Remote execution errors

use thiserror::Error;

/// Errors that can occur when running a command on a remote host
#[derive(Debug, Error)]
pub enum RemoteExecError {
    /// The local transport program (ssh) could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote command finished with a non-zero exit that is not a
    /// transport drop
    #[error("`{command}` on {host} failed ({}): {output}", describe_exit(.exit_code))]
    CommandFailed {
        host: String,
        command: String,
        /// Exit code, `None` when the process was killed by a signal
        exit_code: Option<i32>,
        /// Captured stderr followed by stdout
        output: String,
    },
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
