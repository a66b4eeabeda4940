//! DigitalOcean API models
//!
//! These models cover the subset of the v2 API responses used by the
//! kernel upgrade controller. Unknown fields are ignored on decode.
//! See: https://docs.digitalocean.com/reference/api/api-reference/#tag/Droplets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Droplet model (a fleet member)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Droplet {
    pub id: u64,
    /// Droplet name, also used as the SSH hostname
    pub name: String,
    pub status: DropletStatus,
    /// Currently selected kernel; `None` for images that boot their own kernel
    pub kernel: Option<Kernel>,
}

/// Kernel available to (or selected on) a droplet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kernel {
    pub id: u64,
    /// Human label, e.g. "CentOS 7 x64 vmlinuz-3.10.0-327.36.3.el7.x86_64"
    pub name: String,
    /// Version string, e.g. "3.10.0-327.36.3.el7.x86_64"
    pub version: String,
}

impl Kernel {
    /// Numeric components of the version, in order.
    ///
    /// The version is split on `.` and `-`; tokens that are not purely
    /// numeric (`el7`, `x86_64`) are discarded. Comparing the keys
    /// lexicographically orders kernels from oldest to newest.
    #[must_use]
    pub fn version_key(&self) -> Vec<u64> {
        self.version
            .split(['.', '-'])
            .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|token| token.parse().ok())
            .collect()
    }
}

// Kernels are identified by id only.
impl PartialEq for Kernel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Kernel {}

/// Droplet power status
///
/// Values outside the documented set are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DropletStatus {
    New,
    Active,
    Off,
    Archive,
    Other(String),
}

impl DropletStatus {
    /// Wire representation of the status
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Off => "off",
            Self::Archive => "archive",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for DropletStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "new" => Self::New,
            "active" => Self::Active,
            "off" => Self::Off,
            "archive" => Self::Archive,
            _ => Self::Other(value),
        }
    }
}

impl From<DropletStatus> for String {
    fn from(status: DropletStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for DropletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asynchronous operation tracked by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: u64,
    pub status: ActionStatus,
    #[serde(rename = "type", default)]
    pub action_type: String,
    #[serde(default)]
    pub resource_id: Option<u64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Action status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    InProgress,
    Completed,
    Errored,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Errored => "errored",
        })
    }
}

/// Request body for `POST /v2/droplets/{id}/actions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropletActionRequest {
    ChangeKernel { kernel: u64 },
    PowerOn,
}

/// Pagination links returned alongside list responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub pages: Option<PageLinks>,
}

/// Page navigation URLs (absent on the last page)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
}

/// One page of `GET /v2/droplets`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropletsPage {
    pub droplets: Vec<Droplet>,
    #[serde(default)]
    pub links: Links,
}

/// One page of `GET /v2/droplets/{id}/kernels`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelsPage {
    pub kernels: Vec<Kernel>,
    #[serde(default)]
    pub links: Links,
}

/// `{"action": {...}}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub action: Action,
}

/// `{"droplet": {...}}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropletEnvelope {
    pub droplet: Droplet,
}
