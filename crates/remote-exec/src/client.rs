//! Typed remote operations used by the kernel upgrade

use crate::error::RemoteExecError;
use crate::executor::{ExecOutcome, RemoteExecutor};
use tracing::{debug, info};

const SHUTDOWN: &[&str] = &["shutdown", "-h", "now"];
const KERNEL_VERSION: &[&str] = &["uname", "-r"];

/// Remote operations on fleet hosts
#[derive(Debug, Clone)]
pub struct RemoteClient<E> {
    executor: E,
}

impl<E: RemoteExecutor> RemoteClient<E> {
    /// Wrap an executor
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Underlying executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run `argv` on `host` and classify the result
    pub async fn run(&self, host: &str, argv: &[&str]) -> ExecOutcome {
        match self.executor.execute(host, argv).await {
            Ok(output) => output.into_outcome(host, &argv.join(" ")),
            Err(e) => ExecOutcome::Fatal(e),
        }
    }

    /// Power the host off from inside the guest.
    ///
    /// The command takes down its own ssh session, so a dropped connection
    /// counts as success.
    pub async fn shutdown(&self, host: &str) -> Result<(), RemoteExecError> {
        info!("Shutting down {}", host);
        match self.run(host, SHUTDOWN).await {
            ExecOutcome::Success(_) => Ok(()),
            ExecOutcome::Transient(reason) => {
                debug!("Shutdown of {} dropped the connection as expected: {}", host, reason);
                Ok(())
            }
            ExecOutcome::Fatal(e) => Err(e),
        }
    }

    /// Kernel release the host is currently running (`uname -r`)
    pub async fn running_kernel_version(&self, host: &str) -> ExecOutcome {
        self.run(host, KERNEL_VERSION).await
    }
}
