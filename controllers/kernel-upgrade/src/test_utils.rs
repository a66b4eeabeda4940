//! Test utilities for orchestrator tests
//!
//! Builders for droplets and kernels plus a fleet wired to the mock clients.

#[cfg(test)]
use crate::backoff::BackoffPolicy;
#[cfg(test)]
use crate::orchestrator::{FailurePolicy, Orchestrator, PollPolicies, UpgradeSettings};
#[cfg(test)]
use droplet_client::{Droplet, DropletStatus, Kernel, MockDropletClient};
#[cfg(test)]
use remote_exec::{MockExecutor, RemoteClient};
#[cfg(test)]
use std::time::Duration;

/// Kernel named the way the provider lists them, e.g. "CentOS 7 x64 vmlinuz-3.10.0-123"
#[cfg(test)]
pub fn create_test_kernel(id: u64, distribution: &str, version: &str) -> Kernel {
    Kernel {
        id,
        name: format!("{distribution} x64 vmlinuz-{version}"),
        version: version.to_string(),
    }
}

/// Active droplet named `web-{id}`
#[cfg(test)]
pub fn create_test_droplet(id: u64, kernel: Option<Kernel>) -> Droplet {
    Droplet {
        id,
        name: format!("web-{id}"),
        status: DropletStatus::Active,
        kernel,
    }
}

/// Small count-only schedules so exhaustion is reached after a few probes
#[cfg(test)]
pub fn create_test_settings(failure_policy: FailurePolicy) -> UpgradeSettings {
    let quick = BackoffPolicy::new(3, Duration::ZERO, 4);
    UpgradeSettings {
        kernel_prefix: "CentOS 7".to_string(),
        failure_policy,
        polls: PollPolicies {
            action: quick,
            status: quick,
            kernel: quick,
        },
        droplet_filter: Vec::new(),
    }
}

/// Mocks plus an orchestrator sharing them
#[cfg(test)]
pub struct TestFleet {
    pub client: MockDropletClient,
    pub executor: MockExecutor,
    pub orchestrator: Orchestrator<MockDropletClient, MockExecutor>,
}

#[cfg(test)]
impl TestFleet {
    pub fn new(settings: UpgradeSettings, droplets: Vec<(Droplet, Vec<Kernel>)>) -> Self {
        let client = MockDropletClient::new("http://mock-digitalocean");
        for (droplet, kernels) in droplets {
            client.set_kernels(droplet.id, kernels);
            client.add_droplet(droplet);
        }
        let executor = MockExecutor::new();
        let orchestrator = Orchestrator::new(
            client.clone(),
            RemoteClient::new(executor.clone()),
            settings,
        );
        Self {
            client,
            executor,
            orchestrator,
        }
    }
}
