//! Mock executor for unit testing
//!
//! Results are scripted per host and command line; each call pops the next
//! scripted result and the last one repeats. Unscripted commands succeed with
//! empty output.

use crate::error::RemoteExecError;
use crate::executor::{CommandOutput, RemoteExecutor};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock RemoteExecutor for testing
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    scripts: Arc<Mutex<HashMap<(String, String), VecDeque<CommandOutput>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockExecutor {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned by successive runs of `command` (space joined argv) on `host`
    pub fn script(&self, host: &str, command: &str, outputs: Vec<CommandOutput>) {
        lock(&self.scripts).insert((host.to_string(), command.to_string()), outputs.into());
    }

    /// Every `(host, command)` executed so far, in order
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }

    /// Number of times `command` ran on `host`
    pub fn call_count(&self, host: &str, command: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(h, c)| h == host && c == command)
            .count()
    }
}

#[async_trait::async_trait]
impl RemoteExecutor for MockExecutor {
    async fn execute(&self, host: &str, argv: &[&str]) -> Result<CommandOutput, RemoteExecError> {
        let command = argv.join(" ");
        lock(&self.calls).push((host.to_string(), command.clone()));

        let mut scripts = lock(&self.scripts);
        let output = match scripts.get_mut(&(host.to_string(), command)) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            None => None,
        };
        Ok(output.unwrap_or_else(|| CommandOutput::success("")))
    }
}
