//! Configuration loaded from environment variables.

use crate::backoff::{BackoffPolicy, MAX_CEILING};
use crate::error::UpgradeError;
use crate::orchestrator::{FailurePolicy, PollPolicies, UpgradeSettings};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";
pub const DEFAULT_KERNEL_PREFIX: &str = "CentOS 7";
const DEFAULT_SSH_CONNECT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone)]
pub struct Config {
    pub api_url: String,
    pub token: String,
    pub kernel_prefix: String,
    pub failure_policy: FailurePolicy,
    pub droplet_filter: Vec<String>,
    pub ssh_binary: String,
    pub ssh_connect_timeout: Duration,
    pub polls: PollPolicies,
    pub log_format: String,
    pub log_level: String,
}

// Keep the API token out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("kernel_prefix", &self.kernel_prefix)
            .field("failure_policy", &self.failure_policy)
            .field("droplet_filter", &self.droplet_filter)
            .field("ssh_binary", &self.ssh_binary)
            .field("ssh_connect_timeout", &self.ssh_connect_timeout)
            .field("polls", &self.polls)
            .field("log_format", &self.log_format)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, UpgradeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, UpgradeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = get("DIGITALOCEAN_TOKEN").or_else(|| get("bearer")).ok_or_else(|| {
            UpgradeError::InvalidConfig(
                "DIGITALOCEAN_TOKEN environment variable is required".to_string(),
            )
        })?;

        let failure_policy = match get("FAILURE_POLICY") {
            Some(value) => value.parse()?,
            None => FailurePolicy::default(),
        };

        let droplet_filter = get("DROPLET_NAME_FILTER")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let ssh_connect_timeout = Duration::from_secs(parse_or(
            &get,
            "SSH_CONNECT_TIMEOUT_SECONDS",
            DEFAULT_SSH_CONNECT_TIMEOUT_SECONDS,
        )?);

        let polls = PollPolicies {
            action: poll_policy(&get, "ACTION_POLL", Duration::from_secs(60))?,
            status: poll_policy(&get, "STATUS_POLL", Duration::from_secs(120))?,
            kernel: poll_policy(&get, "KERNEL_POLL", Duration::from_secs(300))?,
        };

        Ok(Self {
            api_url: get("DIGITALOCEAN_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token,
            kernel_prefix: get("TARGET_KERNEL_PREFIX")
                .unwrap_or_else(|| DEFAULT_KERNEL_PREFIX.to_string()),
            failure_policy,
            droplet_filter,
            ssh_binary: get("SSH_BINARY").unwrap_or_else(|| "ssh".to_string()),
            ssh_connect_timeout,
            polls,
            log_format: get("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Settings handed to the orchestrator
    pub fn upgrade_settings(&self) -> UpgradeSettings {
        UpgradeSettings {
            kernel_prefix: self.kernel_prefix.clone(),
            failure_policy: self.failure_policy,
            polls: self.polls,
            droplet_filter: self.droplet_filter.clone(),
        }
    }

    pub fn display(&self) {
        let filter_info = if self.droplet_filter.is_empty() {
            "NONE (processing ALL droplets)".to_string()
        } else {
            format!("{:?}", self.droplet_filter)
        };

        tracing::info!(
            api_url = %self.api_url,
            kernel_prefix = %self.kernel_prefix,
            failure_policy = ?self.failure_policy,
            droplet_filter = %filter_info,
            ssh_binary = %self.ssh_binary,
            ssh_connect_timeout_seconds = self.ssh_connect_timeout.as_secs(),
            log_format = %self.log_format,
            log_level = %self.log_level,
            "Configuration initialized"
        );
        tracing::debug!(
            action = ?self.polls.action,
            status = ?self.polls.status,
            kernel = ?self.polls.kernel,
            "Poll policies"
        );
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, UpgradeError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| UpgradeError::InvalidConfig(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

fn poll_policy<G>(get: &G, prefix: &str, min_duration: Duration) -> Result<BackoffPolicy, UpgradeError>
where
    G: Fn(&str) -> Option<String>,
{
    let min_count = parse_or(get, &format!("{prefix}_MIN_COUNT"), 5u32)?;
    let min_duration = parse_or(
        get,
        &format!("{prefix}_MIN_DURATION_SECONDS"),
        min_duration.as_secs(),
    )?;
    let ceiling = parse_or(get, &format!("{prefix}_CEILING"), 10u32)?;
    if ceiling == 0 || ceiling > MAX_CEILING {
        return Err(UpgradeError::InvalidConfig(format!(
            "{prefix}_CEILING must be between 1 and {MAX_CEILING}"
        )));
    }
    Ok(BackoffPolicy::new(min_count, Duration::from_secs(min_duration), ceiling))
}
