//! DigitalOcean API client
//!
//! Implements the droplet, kernel and action endpoints of the DigitalOcean
//! v2 REST API: /v2/droplets, /v2/droplets/{id}/kernels,
//! /v2/droplets/{id}/actions and /v2/actions/{id}.

use crate::common::{ACTION_ACCEPTED, HttpClient, READ_OK};
use crate::droplet_trait::DropletClientTrait;
use crate::error::DropletError;
use crate::models::*;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Page size used when listing droplets
pub const DROPLETS_PER_PAGE: u32 = 100;

/// Page size used when listing kernels
pub const KERNELS_PER_PAGE: u32 = 1000;

/// Status codes accepted when polling an action
const ACTION_READ_OK: &[u16] = &[200, 201];

/// DigitalOcean API client
#[derive(Debug, Clone)]
pub struct DropletClient {
    http: HttpClient,
}

impl DropletClient {
    /// Create a new DigitalOcean client
    ///
    /// # Arguments
    /// * `base_url` - API base URL (e.g., "https://api.digitalocean.com")
    /// * `token` - Bearer token sent on every request
    pub fn new(base_url: String, token: String) -> Result<Self, DropletError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(DropletError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API token by making a simple authenticated request.
    ///
    /// Uses the account endpoint, which is lightweight and requires a valid token.
    pub async fn validate_token(&self) -> Result<(), DropletError> {
        debug!("Validating DigitalOcean token and connectivity");
        let _: serde_json::Value = self.http.get("/v2/account", READ_OK).await?;
        debug!("Token validated successfully");
        Ok(())
    }

    /// List every droplet on the account, following pagination
    pub async fn list_droplets(&self) -> Result<Vec<Droplet>, DropletError> {
        let path = format!("/v2/droplets?page=1&per_page={DROPLETS_PER_PAGE}");
        let droplets = self.http.fetch_all_pages::<DropletsPage>(&path).await?;
        debug!("Fetched {} droplets", droplets.len());
        Ok(droplets)
    }

    /// List the kernels a droplet can be switched to
    ///
    /// # Arguments
    /// * `droplet_id` - Droplet ID
    pub async fn list_kernels(&self, droplet_id: u64) -> Result<Vec<Kernel>, DropletError> {
        let path = format!("/v2/droplets/{droplet_id}/kernels?page=1&per_page={KERNELS_PER_PAGE}");
        let kernels = self.http.fetch_all_pages::<KernelsPage>(&path).await?;
        debug!("Fetched {} kernels for droplet {}", kernels.len(), droplet_id);
        Ok(kernels)
    }

    /// Get a single droplet (used to poll its power status)
    pub async fn get_droplet(&self, droplet_id: u64) -> Result<Droplet, DropletError> {
        let envelope: DropletEnvelope = self
            .http
            .get(&format!("/v2/droplets/{droplet_id}"), READ_OK)
            .await?;
        Ok(envelope.droplet)
    }

    /// Submit a `change_kernel` action
    ///
    /// # Returns
    /// * `Ok(Action)` - The accepted action, usually still `in-progress`
    /// * `Err(DropletError::Api)` - If the request was not accepted (200/201)
    pub async fn change_kernel(&self, droplet_id: u64, kernel_id: u64) -> Result<Action, DropletError> {
        info!("Setting new kernel id {} on droplet {}", kernel_id, droplet_id);
        self.submit_action(droplet_id, &DropletActionRequest::ChangeKernel { kernel: kernel_id })
            .await
    }

    /// Submit a `power_on` action
    pub async fn power_on(&self, droplet_id: u64) -> Result<Action, DropletError> {
        info!("Powering on droplet {}", droplet_id);
        self.submit_action(droplet_id, &DropletActionRequest::PowerOn).await
    }

    /// Get the current state of an action
    ///
    /// A decoded action that is still `in-progress` is returned as-is; only
    /// unexpected status codes are errors.
    pub async fn get_action(&self, action_id: u64) -> Result<Action, DropletError> {
        let envelope: ActionEnvelope = self
            .http
            .get(&format!("/v2/actions/{action_id}"), ACTION_READ_OK)
            .await?;
        Ok(envelope.action)
    }

    async fn submit_action(
        &self,
        droplet_id: u64,
        request: &DropletActionRequest,
    ) -> Result<Action, DropletError> {
        let envelope: ActionEnvelope = self
            .http
            .post(&format!("/v2/droplets/{droplet_id}/actions"), request, ACTION_ACCEPTED)
            .await?;
        debug!(
            "Action {} ({}) accepted with status {}",
            envelope.action.id, envelope.action.action_type, envelope.action.status
        );
        Ok(envelope.action)
    }
}

#[async_trait::async_trait]
impl DropletClientTrait for DropletClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn validate_token(&self) -> Result<(), DropletError> {
        self.validate_token().await
    }

    async fn list_droplets(&self) -> Result<Vec<Droplet>, DropletError> {
        self.list_droplets().await
    }

    async fn list_kernels(&self, droplet_id: u64) -> Result<Vec<Kernel>, DropletError> {
        self.list_kernels(droplet_id).await
    }

    async fn get_droplet(&self, droplet_id: u64) -> Result<Droplet, DropletError> {
        self.get_droplet(droplet_id).await
    }

    async fn change_kernel(&self, droplet_id: u64, kernel_id: u64) -> Result<Action, DropletError> {
        self.change_kernel(droplet_id, kernel_id).await
    }

    async fn power_on(&self, droplet_id: u64) -> Result<Action, DropletError> {
        self.power_on(droplet_id).await
    }

    async fn get_action(&self, action_id: u64) -> Result<Action, DropletError> {
        self.get_action(action_id).await
    }
}
