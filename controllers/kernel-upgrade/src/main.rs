//! Kernel Upgrade Controller
//!
//! Walks every droplet on a DigitalOcean account and moves it onto the newest
//! provider-managed kernel matching `TARGET_KERNEL_PREFIX`:
//! - Selects the latest compatible kernel and sets it on the droplet
//! - Shuts the guest down over SSH and waits for the droplet to report off
//! - Powers it back on and waits for it to report active
//! - Confirms over SSH that the guest actually booted the new kernel
//!
//! Droplets already on the latest kernel are left untouched, so the run can be
//! repeated safely after a partial failure.

mod backoff;
mod config;
mod error;
mod kernel;
mod logging;
mod orchestrator;
mod poll;
mod test_utils;

use anyhow::{Context, bail};
use config::Config;
use droplet_client::DropletClient;
use orchestrator::Orchestrator;
use remote_exec::{RemoteClient, SshExecutor};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    logging::init(&config.log_format, &config.log_level);

    info!("Starting Kernel Upgrade Controller");
    config.display();

    let client = DropletClient::new(config.api_url.clone(), config.token.clone())
        .context("Failed to create DigitalOcean client")?;

    let executor = SshExecutor::new(config.ssh_connect_timeout).program_path(config.ssh_binary.clone());
    let orchestrator = Orchestrator::new(client, RemoteClient::new(executor), config.upgrade_settings());
    orchestrator.validate_access().await?;

    let report = orchestrator.run().await.context("Kernel upgrade run aborted")?;
    report.log_summary();

    if report.has_failures() {
        bail!(
            "{} of {} droplets failed to upgrade",
            report.failures().count(),
            report.members.len()
        );
    }

    Ok(())
}
