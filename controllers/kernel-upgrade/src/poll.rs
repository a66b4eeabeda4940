//! Poll-until-condition primitives.
//!
//! `poll_until` drives a probe with a backoff schedule. Each probe reports
//! one of three things:
//! - `Ok(Probe::Ready(v))`: the condition holds, return `v` at once
//! - `Ok(Probe::Pending(p))`: not yet, sleep for the next backoff interval
//! - `Err(e)`: hard failure, abort without further attempts
//!
//! When the schedule runs out the loop fails with `PollError::Exhausted`
//! carrying the last pending observation. The `wait_for_*` functions below
//! are the instantiations the orchestrator uses and translate exhaustion
//! into `UpgradeError::Timeout` (or `VersionMismatch`).

use crate::backoff::{Backoff, BackoffPolicy};
use crate::error::UpgradeError;
use droplet_client::{Action, ActionStatus, DropletClientTrait, DropletStatus};
use rand::Rng;
use remote_exec::{ExecOutcome, RemoteClient, RemoteExecutor};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Result of one successful probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T, P> {
    /// Condition holds
    Ready(T),
    /// Condition does not hold yet; carries what was observed instead
    Pending(P),
}

/// Why a poll loop gave up
#[derive(Debug)]
pub enum PollError<E, P> {
    /// A probe failed hard
    Fatal(E),
    /// The backoff schedule ran out while the condition was still pending
    Exhausted {
        attempts: u32,
        waited: Duration,
        last: Option<P>,
    },
}

/// Probe until ready, sleeping between attempts as the schedule dictates
pub async fn poll_until<T, P, E, R, F, Fut>(
    label: &str,
    mut schedule: Backoff<R>,
    mut probe: F,
) -> Result<T, PollError<E, P>>
where
    P: Debug,
    R: Rng,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T, P>, E>>,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let pending = match probe().await {
            Ok(Probe::Ready(value)) => {
                debug!(attempts, "{} satisfied", label);
                return Ok(value);
            }
            Ok(Probe::Pending(observed)) => observed,
            Err(e) => return Err(PollError::Fatal(e)),
        };

        let Some(wait) = schedule.next() else {
            return Err(PollError::Exhausted {
                attempts,
                waited: schedule.total(),
                last: Some(pending),
            });
        };

        debug!(
            attempts,
            observed = ?pending,
            wait_seconds = format!("{:.1}", wait.as_secs_f64()),
            "{} not satisfied yet, backing off",
            label
        );
        sleep(wait).await;
    }
}

/// Wait for a submitted action to complete.
///
/// An action already `completed` at submission skips the poll; one already
/// `errored` is rejected immediately.
pub async fn wait_for_action<C>(
    client: &C,
    action: Action,
    description: &str,
    policy: &BackoffPolicy,
) -> Result<Action, UpgradeError>
where
    C: DropletClientTrait + ?Sized,
{
    match action.status {
        ActionStatus::Completed => {
            debug!("{} action {} completed on submission", description, action.id);
            return Ok(action);
        }
        ActionStatus::Errored => {
            return Err(UpgradeError::ActionRejected {
                description: description.to_string(),
                action_id: action.id,
                status: action.status,
            });
        }
        ActionStatus::InProgress => {}
    }

    let action_id = action.id;
    info!("Verifying action completed, id: {}", action_id);

    let label = format!("action {action_id}");
    poll_until(&label, policy.schedule(), || {
        probe_action(client, action_id, description)
    })
    .await
    .map_err(|e| match e {
        PollError::Fatal(e) => e,
        PollError::Exhausted { attempts, waited, .. } => {
            warn!(
                action_id,
                attempts,
                waited_seconds = waited.as_secs(),
                "{} action still not completed",
                description
            );
            UpgradeError::Timeout {
                condition: format!("{description} action to complete"),
                target: format!("action {action_id}"),
            }
        }
    })
}

async fn probe_action<C>(
    client: &C,
    action_id: u64,
    description: &str,
) -> Result<Probe<Action, ActionStatus>, UpgradeError>
where
    C: DropletClientTrait + ?Sized,
{
    let action = client.get_action(action_id).await?;
    if action.id != action_id {
        warn!("Asked for action {} but got {}, ignoring", action_id, action.id);
        return Ok(Probe::Pending(action.status));
    }

    match action.status {
        ActionStatus::Completed => Ok(Probe::Ready(action)),
        ActionStatus::InProgress => Ok(Probe::Pending(action.status)),
        ActionStatus::Errored => Err(UpgradeError::ActionRejected {
            description: description.to_string(),
            action_id,
            status: action.status,
        }),
    }
}

/// Wait for a droplet to report the `target` power status
pub async fn wait_for_status<C>(
    client: &C,
    droplet_id: u64,
    target: &DropletStatus,
    policy: &BackoffPolicy,
) -> Result<(), UpgradeError>
where
    C: DropletClientTrait + ?Sized,
{
    info!("Verifying status {} on droplet id: {}", target, droplet_id);

    let label = format!("droplet {droplet_id} status {target}");
    poll_until(&label, policy.schedule(), || probe_status(client, droplet_id, target))
        .await
        .map_err(|e| match e {
            PollError::Fatal(e) => e,
            PollError::Exhausted { attempts, last, .. } => {
                let last = last.map_or_else(|| "nothing".to_string(), |s| s.to_string());
                warn!(droplet_id, attempts, last_status = %last, "Droplet still not {}", target);
                UpgradeError::Timeout {
                    condition: format!("status {target} (last seen {last})"),
                    target: format!("droplet {droplet_id}"),
                }
            }
        })
}

async fn probe_status<C>(
    client: &C,
    droplet_id: u64,
    target: &DropletStatus,
) -> Result<Probe<(), DropletStatus>, UpgradeError>
where
    C: DropletClientTrait + ?Sized,
{
    let droplet = client.get_droplet(droplet_id).await?;
    if droplet.status == *target {
        Ok(Probe::Ready(()))
    } else {
        Ok(Probe::Pending(droplet.status))
    }
}

/// What a kernel probe saw when the expected version was not running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelObservation {
    /// ssh could not get through (host still booting)
    Unreachable(String),
    /// Host answered with another kernel release
    Running(String),
}

/// Wait until `host` reports `expected` from `uname -r`.
///
/// Dropped or refused connections are retried; other command failures
/// abort. If the host was still reporting another kernel when the schedule
/// ran out the result is `VersionMismatch`, otherwise `Timeout`.
pub async fn wait_for_kernel<E>(
    remote: &RemoteClient<E>,
    host: &str,
    expected: &str,
    policy: &BackoffPolicy,
) -> Result<(), UpgradeError>
where
    E: RemoteExecutor,
{
    info!("Verifying {} runs kernel {}", host, expected);

    let label = format!("kernel {expected} on {host}");
    poll_until(&label, policy.schedule(), || probe_kernel(remote, host, expected))
        .await
        .map_err(|e| match e {
            PollError::Fatal(e) => e,
            PollError::Exhausted {
                last: Some(KernelObservation::Running(actual)),
                ..
            } => UpgradeError::VersionMismatch {
                host: host.to_string(),
                expected: expected.to_string(),
                actual,
            },
            PollError::Exhausted { attempts, .. } => {
                warn!(host, attempts, "Host still unreachable over ssh");
                UpgradeError::Timeout {
                    condition: format!("kernel {expected}"),
                    target: format!("host {host}"),
                }
            }
        })
}

async fn probe_kernel<E>(
    remote: &RemoteClient<E>,
    host: &str,
    expected: &str,
) -> Result<Probe<(), KernelObservation>, UpgradeError>
where
    E: RemoteExecutor,
{
    match remote.running_kernel_version(host).await {
        ExecOutcome::Success(actual) if actual == expected => Ok(Probe::Ready(())),
        ExecOutcome::Success(actual) => Ok(Probe::Pending(KernelObservation::Running(actual))),
        ExecOutcome::Transient(reason) => {
            debug!("{} not reachable yet: {}", host, reason);
            Ok(Probe::Pending(KernelObservation::Unreachable(reason)))
        }
        ExecOutcome::Fatal(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droplet_client::{Droplet, MockDropletClient};
    use remote_exec::{CommandOutput, MockExecutor};
    use std::cell::Cell;

    fn policy(min_count: u32) -> BackoffPolicy {
        BackoffPolicy::new(min_count, Duration::ZERO, 10)
    }

    fn droplet(id: u64, status: DropletStatus) -> Droplet {
        Droplet {
            id,
            name: format!("web-{id}"),
            status,
            kernel: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_ready_immediately_does_not_sleep() {
        let started = tokio::time::Instant::now();
        let result: Result<u32, PollError<String, ()>> =
            poll_until("immediate", policy(5).schedule(), || async { Ok(Probe::Ready(7)) }).await;
        assert_eq!(result.ok(), Some(7));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_retries_pending() {
        let calls = Cell::new(0);
        let result: Result<&str, PollError<String, u32>> =
            poll_until("retry", policy(5).schedule(), || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 { Ok(Probe::Pending(n)) } else { Ok(Probe::Ready("done")) }
                }
            })
            .await;
        assert_eq!(result.ok(), Some("done"));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_fatal_aborts_without_retry() {
        let calls = Cell::new(0);
        let result: Result<(), PollError<String, ()>> =
            poll_until("fatal", policy(5).schedule(), || {
                calls.set(calls.get() + 1);
                async { Err("boom".to_string()) }
            })
            .await;
        assert!(matches!(result, Err(PollError::Fatal(e)) if e == "boom"));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_exhaustion_reports_last_observation() {
        let calls = Cell::new(0);
        let result: Result<(), PollError<String, u32>> =
            poll_until("exhaust", policy(3).schedule(), || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Ok(Probe::Pending(n)) }
            })
            .await;
        match result {
            Err(PollError::Exhausted { attempts, last, .. }) => {
                // one probe per wait plus the initial one
                assert_eq!(attempts, 4);
                assert_eq!(last, Some(4));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_skips_poll_when_completed() {
        let client = MockDropletClient::new("http://test");
        let action = MockDropletClient::action(10, "power_on", ActionStatus::Completed);
        wait_for_action(&client, action, "Powering on", &policy(5))
            .await
            .expect("completed action needs no wait");
        assert_eq!(client.action_poll_count(10), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_rejects_errored_submission() {
        let client = MockDropletClient::new("http://test");
        let action = MockDropletClient::action(10, "change_kernel", ActionStatus::Errored);
        let err = wait_for_action(&client, action, "Changing kernel", &policy(5))
            .await
            .expect_err("errored action must fail");
        assert!(matches!(err, UpgradeError::ActionRejected { action_id: 10, .. }));
        assert_eq!(client.action_poll_count(10), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_polls_until_completed() {
        let client = MockDropletClient::new("http://test");
        client.script_action(
            10,
            vec![ActionStatus::InProgress, ActionStatus::InProgress, ActionStatus::Completed],
        );
        let action = MockDropletClient::action(10, "change_kernel", ActionStatus::InProgress);
        let done = wait_for_action(&client, action, "Changing kernel", &policy(5))
            .await
            .expect("action completes on third poll");
        assert_eq!(done.status, ActionStatus::Completed);
        assert_eq!(client.action_poll_count(10), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_errored_while_polling_is_fatal() {
        let client = MockDropletClient::new("http://test");
        client.script_action(10, vec![ActionStatus::InProgress, ActionStatus::Errored]);
        let action = MockDropletClient::action(10, "change_kernel", ActionStatus::InProgress);
        let err = wait_for_action(&client, action, "Changing kernel", &policy(5))
            .await
            .expect_err("errored action must fail");
        assert!(matches!(err, UpgradeError::ActionRejected { .. }));
        assert_eq!(client.action_poll_count(10), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_ignores_mismatched_action_id() {
        let client = MockDropletClient::new("http://test");
        client.script_action(10, vec![ActionStatus::Completed]);
        client.script_action_ids(10, vec![99, 10]);
        let action = MockDropletClient::action(10, "change_kernel", ActionStatus::InProgress);
        let done = wait_for_action(&client, action, "Changing kernel", &policy(5))
            .await
            .expect("matching id completes on second poll");
        assert_eq!(done.id, 10);
        assert_eq!(client.action_poll_count(10), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_always_mismatched_id_times_out() {
        let client = MockDropletClient::new("http://test");
        client.script_action(10, vec![ActionStatus::Completed]);
        client.script_action_ids(10, vec![99]);
        let action = MockDropletClient::action(10, "change_kernel", ActionStatus::InProgress);
        let err = wait_for_action(&client, action, "Changing kernel", &policy(2))
            .await
            .expect_err("another action's completion must not count");
        assert!(matches!(err, UpgradeError::Timeout { target, .. } if target == "action 10"));
        assert_eq!(client.action_poll_count(10), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_action_api_error_is_fatal() {
        let client = MockDropletClient::new("http://test");
        client.fail_with("get_action", 500, "internal error");
        let action = MockDropletClient::action(10, "change_kernel", ActionStatus::InProgress);
        let err = wait_for_action(&client, action, "Changing kernel", &policy(5))
            .await
            .expect_err("500 must fail");
        assert!(matches!(err, UpgradeError::Api(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_status_times_out_naming_droplet() {
        let client = MockDropletClient::new("http://test");
        client.add_droplet(droplet(3, DropletStatus::Active));
        let err = wait_for_status(&client, 3, &DropletStatus::Off, &policy(2))
            .await
            .expect_err("droplet never turns off");
        match err {
            UpgradeError::Timeout { condition, target } => {
                assert_eq!(condition, "status off (last seen active)");
                assert_eq!(target, "droplet 3");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(client.status_poll_count(3), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_status_converges() {
        let client = MockDropletClient::new("http://test");
        client.add_droplet(droplet(3, DropletStatus::Active));
        client.script_status(
            3,
            vec![
                DropletStatus::Active,
                DropletStatus::Other("shutting-down".to_string()),
                DropletStatus::Off,
            ],
        );
        wait_for_status(&client, 3, &DropletStatus::Off, &policy(5))
            .await
            .expect("droplet turns off");
        assert_eq!(client.status_poll_count(3), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_kernel_tolerates_connection_refused() {
        let executor = MockExecutor::new();
        executor.script(
            "web-1",
            "uname -r",
            vec![
                CommandOutput::connection_lost(),
                CommandOutput::connection_lost(),
                CommandOutput::success("3.10.0-456\n"),
            ],
        );
        let remote = RemoteClient::new(executor.clone());
        wait_for_kernel(&remote, "web-1", "3.10.0-456", &policy(5))
            .await
            .expect("host boots into the new kernel");
        assert_eq!(executor.call_count("web-1", "uname -r"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_kernel_other_failure_is_fatal() {
        let executor = MockExecutor::new();
        executor.script("web-1", "uname -r", vec![CommandOutput::exited(127, "uname: not found")]);
        let remote = RemoteClient::new(executor.clone());
        let err = wait_for_kernel(&remote, "web-1", "3.10.0-456", &policy(5))
            .await
            .expect_err("exit 127 must fail");
        assert!(matches!(err, UpgradeError::RemoteExec(_)));
        assert_eq!(executor.call_count("web-1", "uname -r"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_kernel_mismatch_after_retries() {
        let executor = MockExecutor::new();
        executor.script("web-1", "uname -r", vec![CommandOutput::success("3.10.0-123")]);
        let remote = RemoteClient::new(executor.clone());
        let err = wait_for_kernel(&remote, "web-1", "3.10.0-456", &policy(3))
            .await
            .expect_err("old kernel keeps running");
        match err {
            UpgradeError::VersionMismatch { host, expected, actual } => {
                assert_eq!(host, "web-1");
                assert_eq!(expected, "3.10.0-456");
                assert_eq!(actual, "3.10.0-123");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
        assert_eq!(executor.call_count("web-1", "uname -r"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_kernel_unreachable_is_timeout() {
        let executor = MockExecutor::new();
        executor.script("web-1", "uname -r", vec![CommandOutput::connection_lost()]);
        let remote = RemoteClient::new(executor);
        let err = wait_for_kernel(&remote, "web-1", "3.10.0-456", &policy(2))
            .await
            .expect_err("host never comes back");
        assert!(matches!(err, UpgradeError::Timeout { target, .. } if target == "host web-1"));
    }
}
