//! DropletClient trait for mocking
//!
//! This trait abstracts the DropletClient to enable mocking in unit tests.
//! The concrete DropletClient implements this trait, and tests can use mock implementations.

use crate::error::DropletError;
use crate::models::{Action, Droplet, Kernel};

/// Trait for DigitalOcean API client operations
///
/// All async methods must be `Send` to work with Tokio's runtime.
#[async_trait::async_trait]
pub trait DropletClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), DropletError>;

    // Reads
    async fn list_droplets(&self) -> Result<Vec<Droplet>, DropletError>;
    async fn list_kernels(&self, droplet_id: u64) -> Result<Vec<Kernel>, DropletError>;
    async fn get_droplet(&self, droplet_id: u64) -> Result<Droplet, DropletError>;
    async fn get_action(&self, action_id: u64) -> Result<Action, DropletError>;

    // Mutations
    async fn change_kernel(&self, droplet_id: u64, kernel_id: u64) -> Result<Action, DropletError>;
    async fn power_on(&self, droplet_id: u64) -> Result<Action, DropletError>;
}
