//! Controller-specific error types.
//!
//! This module defines the failures of a kernel upgrade run that are not
//! covered by the client library errors.

use droplet_client::{ActionStatus, DropletError};
use remote_exec::RemoteExecError;
use thiserror::Error;

/// Errors that can occur while upgrading a droplet's kernel.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// DigitalOcean API error
    #[error("DigitalOcean error: {0}")]
    Api(#[from] DropletError),

    /// Remote command failed for a reason other than a dropped connection
    #[error("Remote execution error: {0}")]
    RemoteExec(#[from] RemoteExecError),

    /// A polling loop ran out of backoff budget
    #[error("Timed out waiting for {condition} on {target}")]
    Timeout {
        /// What was awaited, e.g. "action to complete"
        condition: String,
        /// Action id, droplet id or hostname
        target: String,
    },

    /// The host came back on a different kernel than the one selected
    #[error("Host {host} is running kernel {actual} although we just rebooted to {expected}")]
    VersionMismatch {
        host: String,
        expected: String,
        actual: String,
    },

    /// The control plane reported the action as failed
    #[error("{description} returned error status: action {action_id} is {status}")]
    ActionRejected {
        description: String,
        action_id: u64,
        status: ActionStatus,
    },

    /// None of the droplet's available kernels match the target prefix
    #[error("No kernel matching '{prefix}' is available for droplet {droplet}")]
    NoCompatibleKernel { droplet: String, prefix: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
