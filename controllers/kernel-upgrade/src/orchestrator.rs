//! Kernel upgrade orchestration.
//!
//! This module contains the `Orchestrator` that walks the fleet and, for each
//! droplet whose selected kernel is not the newest compatible one, drives:
//!
//! ```text
//! Checking -> SettingKernel -> ShuttingDown -> VerifyingOff
//!          -> PoweringOn -> VerifyingActive -> VerifyingKernel -> Done
//! ```
//!
//! Every step waits for the previous one to be confirmed. A failure aborts the
//! droplet where it stands; nothing is rolled back. Re-running is safe because
//! `Checking` looks at the droplet's live kernel again.

use crate::backoff::BackoffPolicy;
use crate::error::UpgradeError;
use crate::kernel::latest_kernel;
use crate::poll::{wait_for_action, wait_for_kernel, wait_for_status};
use droplet_client::{Droplet, DropletClientTrait, DropletStatus, Kernel};
use remote_exec::{RemoteClient, RemoteExecutor};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

/// Step of a single droplet's upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Checking,
    SettingKernel,
    ShuttingDown,
    VerifyingOff,
    PoweringOn,
    VerifyingActive,
    VerifyingKernel,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Checking => "checking",
            Self::SettingKernel => "setting-kernel",
            Self::ShuttingDown => "shutting-down",
            Self::VerifyingOff => "verifying-off",
            Self::PoweringOn => "powering-on",
            Self::VerifyingActive => "verifying-active",
            Self::VerifyingKernel => "verifying-kernel",
            Self::Done => "done",
        })
    }
}

/// What to do when one droplet fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole run on the first failure
    #[default]
    FailFast,
    /// Record the failure and move on to the next droplet
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = UpgradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" | "abort" => Ok(Self::FailFast),
            "continue" | "isolate" => Ok(Self::Continue),
            other => Err(UpgradeError::InvalidConfig(format!(
                "unknown failure policy '{other}' (expected fail-fast or continue)"
            ))),
        }
    }
}

/// Backoff policies for the three kinds of waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicies {
    /// Waiting for a submitted action to complete
    pub action: BackoffPolicy,
    /// Waiting for a droplet to report off / active
    pub status: BackoffPolicy,
    /// Waiting for the guest to come back on the new kernel
    pub kernel: BackoffPolicy,
}

/// Run-wide settings
#[derive(Debug, Clone)]
pub struct UpgradeSettings {
    /// Only kernels whose name starts with this are candidates
    pub kernel_prefix: String,
    pub failure_policy: FailurePolicy,
    pub polls: PollPolicies,
    /// Droplet names to process; empty means the whole fleet
    pub droplet_filter: Vec<String>,
}

/// Result of processing one droplet
#[derive(Debug)]
pub enum MemberOutcome {
    /// Already on the newest compatible kernel; nothing was changed
    UpToDate { kernel: String },
    /// Switched kernels and rebooted
    Upgraded { from: String, to: String },
    /// Not eligible (no provider-managed kernel)
    Skipped { reason: String },
    /// Failed under `FailurePolicy::Continue`
    Failed(UpgradeError),
}

/// Per-droplet outcomes of a run, in processing order
#[derive(Debug, Default)]
pub struct FleetReport {
    pub members: Vec<(Droplet, MemberOutcome)>,
}

impl FleetReport {
    /// Droplets that ended in `Failed`
    pub fn failures(&self) -> impl Iterator<Item = (&Droplet, &UpgradeError)> {
        self.members.iter().filter_map(|(d, o)| match o {
            MemberOutcome::Failed(e) => Some((d, e)),
            _ => None,
        })
    }

    /// Whether any droplet failed
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Number of droplets that were upgraded
    pub fn upgraded_count(&self) -> usize {
        self.members
            .iter()
            .filter(|(_, o)| matches!(o, MemberOutcome::Upgraded { .. }))
            .count()
    }

    /// Log one line per droplet and a total
    pub fn log_summary(&self) {
        for (droplet, outcome) in &self.members {
            match outcome {
                MemberOutcome::UpToDate { kernel } => {
                    info!(droplet = %droplet.name, kernel = %kernel, "Up to date");
                }
                MemberOutcome::Upgraded { from, to } => {
                    info!(droplet = %droplet.name, from = %from, to = %to, "Upgraded");
                }
                MemberOutcome::Skipped { reason } => {
                    info!(droplet = %droplet.name, reason = %reason, "Skipped");
                }
                MemberOutcome::Failed(e) => {
                    error!(droplet = %droplet.name, error = %e, "Failed");
                }
            }
        }
        info!(
            total = self.members.len(),
            upgraded = self.upgraded_count(),
            failed = self.failures().count(),
            "Kernel upgrade run finished"
        );
    }
}

/// Drives kernel upgrades across the fleet, one droplet at a time.
#[derive(Debug)]
pub struct Orchestrator<C, E> {
    client: C,
    remote: RemoteClient<E>,
    settings: UpgradeSettings,
}

impl<C, E> Orchestrator<C, E>
where
    C: DropletClientTrait,
    E: RemoteExecutor,
{
    /// Creates a new orchestrator.
    pub fn new(client: C, remote: RemoteClient<E>, settings: UpgradeSettings) -> Self {
        Self {
            client,
            remote,
            settings,
        }
    }

    /// Check the API token and connectivity before touching any droplet.
    pub async fn validate_access(&self) -> Result<(), UpgradeError> {
        info!("Validating DigitalOcean token and connectivity...");
        self.client.validate_token().await.map_err(|e| {
            error!("Failed to validate DigitalOcean token: {}", e);
            error!("Please ensure:");
            error!("  1. DIGITALOCEAN_TOKEN environment variable is set correctly");
            error!("  2. The token has read and write scope");
            error!("  3. The API is reachable at {}", self.client.base_url());
            UpgradeError::Api(e)
        })?;
        info!("DigitalOcean token validated");
        Ok(())
    }

    /// Process every droplet in the fleet sequentially.
    ///
    /// Under `FailFast` the first droplet error is returned as-is; under
    /// `Continue` it is recorded in the report. Failing to list the fleet is
    /// always an error.
    pub async fn run(&self) -> Result<FleetReport, UpgradeError> {
        let droplets = self.client.list_droplets().await?;
        info!("Found {} droplets", droplets.len());

        let mut report = FleetReport::default();
        for droplet in droplets {
            if !self.settings.droplet_filter.is_empty()
                && !self.settings.droplet_filter.contains(&droplet.name)
            {
                debug!(droplet = %droplet.name, "Not in DROPLET_NAME_FILTER, skipping");
                continue;
            }

            let outcome = match self.upgrade_droplet(&droplet).await {
                Ok(outcome) => outcome,
                Err(e) if self.settings.failure_policy == FailurePolicy::Continue => {
                    warn!(droplet = %droplet.name, "Continuing with the next droplet");
                    MemberOutcome::Failed(e)
                }
                Err(e) => return Err(e),
            };
            report.members.push((droplet, outcome));
        }

        Ok(report)
    }

    /// Bring one droplet onto the newest compatible kernel.
    pub async fn upgrade_droplet(&self, droplet: &Droplet) -> Result<MemberOutcome, UpgradeError> {
        let mut phase = Phase::Checking;
        let result = self.drive(droplet, &mut phase).await;
        if let Err(e) = &result {
            error!(
                droplet_id = droplet.id,
                droplet = %droplet.name,
                phase = %phase,
                error = %e,
                "Kernel upgrade failed"
            );
        }
        result
    }

    fn enter(droplet: &Droplet, phase: &mut Phase, next: Phase) {
        *phase = next;
        info!(droplet_id = droplet.id, droplet = %droplet.name, phase = %next, "Entering phase");
    }

    async fn drive(&self, droplet: &Droplet, phase: &mut Phase) -> Result<MemberOutcome, UpgradeError> {
        info!("Checking droplet: id={} name={}", droplet.id, droplet.name);
        let polls = &self.settings.polls;

        let Some(current) = &droplet.kernel else {
            warn!(droplet = %droplet.name, "Droplet has no provider-managed kernel, skipping");
            return Ok(MemberOutcome::Skipped {
                reason: "no provider-managed kernel".to_string(),
            });
        };

        let kernels = self.client.list_kernels(droplet.id).await?;
        let latest: Kernel = latest_kernel(&kernels, &self.settings.kernel_prefix)
            .cloned()
            .ok_or_else(|| UpgradeError::NoCompatibleKernel {
                droplet: droplet.name.clone(),
                prefix: self.settings.kernel_prefix.clone(),
            })?;
        info!("Latest available kernel is: {}", latest.name);

        if *current == latest {
            info!(droplet = %droplet.name, kernel = %current.name, "Kernel is up to date");
            return Ok(MemberOutcome::UpToDate {
                kernel: current.name.clone(),
            });
        }

        info!(
            "Droplet has kernel {}, thus upgrading to the latest, i.e. {}",
            current.name, latest.name
        );

        Self::enter(droplet, phase, Phase::SettingKernel);
        let action = self.client.change_kernel(droplet.id, latest.id).await?;
        wait_for_action(&self.client, action, "Changing kernel", &polls.action).await?;

        Self::enter(droplet, phase, Phase::ShuttingDown);
        self.remote.shutdown(&droplet.name).await?;

        Self::enter(droplet, phase, Phase::VerifyingOff);
        wait_for_status(&self.client, droplet.id, &DropletStatus::Off, &polls.status).await?;

        Self::enter(droplet, phase, Phase::PoweringOn);
        let action = self.client.power_on(droplet.id).await?;
        wait_for_action(&self.client, action, "Powering on", &polls.action).await?;

        Self::enter(droplet, phase, Phase::VerifyingActive);
        wait_for_status(&self.client, droplet.id, &DropletStatus::Active, &polls.status).await?;

        Self::enter(droplet, phase, Phase::VerifyingKernel);
        wait_for_kernel(&self.remote, &droplet.name, &latest.version, &polls.kernel).await?;

        Self::enter(droplet, phase, Phase::Done);
        Ok(MemberOutcome::Upgraded {
            from: current.name.clone(),
            to: latest.name,
        })
    }
}
