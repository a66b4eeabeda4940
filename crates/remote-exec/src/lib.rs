//! Remote command execution
//!
//! Runs commands on fleet hosts over SSH and classifies their results into
//! [`ExecOutcome`]: a clean success, a transient transport failure (the host is
//! rebooting, shutting down or not yet accepting connections) or a fatal
//! command failure.
//!
//! ```no_run
//! use remote_exec::{ExecOutcome, RemoteClient, SshExecutor};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), remote_exec::RemoteExecError> {
//! let remote = RemoteClient::new(SshExecutor::new(Duration::from_secs(10)));
//!
//! match remote.running_kernel_version("web-1").await {
//!     ExecOutcome::Success(version) => println!("web-1 runs {version}"),
//!     ExecOutcome::Transient(reason) => println!("web-1 unreachable: {reason}"),
//!     ExecOutcome::Fatal(e) => return Err(e),
//! }
//!
//! remote.shutdown("web-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod executor;
pub mod ssh;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::RemoteClient;
pub use error::RemoteExecError;
pub use executor::{CommandOutput, ExecOutcome, RemoteExecutor, SSH_CONNECTION_EXIT_CODE};
pub use ssh::SshExecutor;
#[cfg(feature = "test-util")]
pub use mock::MockExecutor;
