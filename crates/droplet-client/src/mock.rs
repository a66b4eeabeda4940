//! Mock DropletClient for unit testing
//!
//! This module provides a mock implementation of DropletClientTrait that can be used
//! in unit tests without talking to the real DigitalOcean API.
//!
//! Polled reads are scripted: each call pops the next scripted value and the
//! last value repeats once the script runs dry, so a test can say "in-progress
//! twice, then completed" and keep polling afterwards.

use crate::droplet_trait::DropletClientTrait;
use crate::error::DropletError;
use crate::models::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A mutating call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationCall {
    /// `change_kernel(droplet_id, kernel_id)`
    ChangeKernel { droplet_id: u64, kernel_id: u64 },
    /// `power_on(droplet_id)`
    PowerOn { droplet_id: u64 },
}

/// Mock DropletClient for testing
///
/// Stores droplets and kernels in memory and can be configured to return
/// specific responses for testing different scenarios.
#[derive(Debug, Clone)]
pub struct MockDropletClient {
    base_url: String,
    droplets: Arc<Mutex<Vec<Droplet>>>,
    kernels: Arc<Mutex<HashMap<u64, Vec<Kernel>>>>,
    change_kernel_responses: Arc<Mutex<HashMap<u64, Action>>>,
    power_on_responses: Arc<Mutex<HashMap<u64, Action>>>,
    action_scripts: Arc<Mutex<HashMap<u64, VecDeque<ActionStatus>>>>,
    // Action id -> ids reported back instead of the requested one
    action_id_scripts: Arc<Mutex<HashMap<u64, VecDeque<u64>>>>,
    status_scripts: Arc<Mutex<HashMap<u64, VecDeque<DropletStatus>>>>,
    // Operation name -> (status, body) returned as an Api error
    failures: Arc<Mutex<HashMap<&'static str, (u16, String)>>>,
    mutations: Arc<Mutex<Vec<MutationCall>>>,
    action_polls: Arc<Mutex<HashMap<u64, usize>>>,
    status_polls: Arc<Mutex<HashMap<u64, usize>>>,
    // Counter for generating action IDs
    next_id: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pop the next scripted value, repeating the last one when only one is left
fn next_scripted<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

impl MockDropletClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            droplets: Arc::new(Mutex::new(Vec::new())),
            kernels: Arc::new(Mutex::new(HashMap::new())),
            change_kernel_responses: Arc::new(Mutex::new(HashMap::new())),
            power_on_responses: Arc::new(Mutex::new(HashMap::new())),
            action_scripts: Arc::new(Mutex::new(HashMap::new())),
            action_id_scripts: Arc::new(Mutex::new(HashMap::new())),
            status_scripts: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            mutations: Arc::new(Mutex::new(Vec::new())),
            action_polls: Arc::new(Mutex::new(HashMap::new())),
            status_polls: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a droplet to the mock store (for test setup)
    pub fn add_droplet(&self, droplet: Droplet) {
        lock(&self.droplets).push(droplet);
    }

    /// Set the kernels available to a droplet (for test setup)
    pub fn set_kernels(&self, droplet_id: u64, kernels: Vec<Kernel>) {
        lock(&self.kernels).insert(droplet_id, kernels);
    }

    /// Action returned when `change_kernel` is called for this droplet
    pub fn set_change_kernel_response(&self, droplet_id: u64, action: Action) {
        lock(&self.change_kernel_responses).insert(droplet_id, action);
    }

    /// Action returned when `power_on` is called for this droplet
    pub fn set_power_on_response(&self, droplet_id: u64, action: Action) {
        lock(&self.power_on_responses).insert(droplet_id, action);
    }

    /// Statuses returned by successive `get_action` calls for an action
    pub fn script_action(&self, action_id: u64, statuses: Vec<ActionStatus>) {
        lock(&self.action_scripts).insert(action_id, statuses.into());
    }

    /// Script the ids `get_action(action_id)` reports, e.g. a stale id first
    pub fn script_action_ids(&self, action_id: u64, reported: Vec<u64>) {
        lock(&self.action_id_scripts).insert(action_id, reported.into());
    }

    /// Statuses returned by successive `get_droplet` calls for a droplet
    pub fn script_status(&self, droplet_id: u64, statuses: Vec<DropletStatus>) {
        lock(&self.status_scripts).insert(droplet_id, statuses.into());
    }

    /// Make an operation (`"list_droplets"`, `"list_kernels"`, `"get_droplet"`,
    /// `"get_action"`, `"change_kernel"`, `"power_on"`) fail with an API error
    pub fn fail_with(&self, operation: &'static str, status: u16, body: impl Into<String>) {
        lock(&self.failures).insert(operation, (status, body.into()));
    }

    /// Every mutating call received so far, in order
    pub fn mutations(&self) -> Vec<MutationCall> {
        lock(&self.mutations).clone()
    }

    /// Number of `get_action` calls made for an action
    pub fn action_poll_count(&self, action_id: u64) -> usize {
        lock(&self.action_polls).get(&action_id).copied().unwrap_or(0)
    }

    /// Number of `get_droplet` calls made for a droplet
    pub fn status_poll_count(&self, droplet_id: u64) -> usize {
        lock(&self.status_polls).get(&droplet_id).copied().unwrap_or(0)
    }

    /// Build an action with the given id and status (for test setup)
    pub fn action(id: u64, action_type: &str, status: ActionStatus) -> Action {
        Action {
            id,
            status,
            action_type: action_type.to_string(),
            resource_id: None,
            started_at: None,
            completed_at: None,
        }
    }

    fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        current
    }

    fn check_failure(&self, operation: &'static str, request: String) -> Result<(), DropletError> {
        match lock(&self.failures).get(operation) {
            Some((status, body)) => Err(DropletError::Api {
                request,
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }

    fn find_droplet(&self, droplet_id: u64) -> Result<Droplet, DropletError> {
        lock(&self.droplets)
            .iter()
            .find(|d| d.id == droplet_id)
            .cloned()
            .ok_or_else(|| DropletError::InvalidRequest(format!("Droplet {droplet_id} not found")))
    }
}

#[async_trait::async_trait]
impl DropletClientTrait for MockDropletClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), DropletError> {
        self.check_failure("validate_token", "GET /v2/account".to_string())
    }

    async fn list_droplets(&self) -> Result<Vec<Droplet>, DropletError> {
        self.check_failure("list_droplets", "GET /v2/droplets".to_string())?;
        Ok(lock(&self.droplets).clone())
    }

    async fn list_kernels(&self, droplet_id: u64) -> Result<Vec<Kernel>, DropletError> {
        self.check_failure("list_kernels", format!("GET /v2/droplets/{droplet_id}/kernels"))?;
        Ok(lock(&self.kernels).get(&droplet_id).cloned().unwrap_or_default())
    }

    async fn get_droplet(&self, droplet_id: u64) -> Result<Droplet, DropletError> {
        self.check_failure("get_droplet", format!("GET /v2/droplets/{droplet_id}"))?;
        *lock(&self.status_polls).entry(droplet_id).or_insert(0) += 1;

        let mut droplet = self.find_droplet(droplet_id)?;
        if let Some(script) = lock(&self.status_scripts).get_mut(&droplet_id) {
            if let Some(status) = next_scripted(script) {
                droplet.status = status;
            }
        }
        Ok(droplet)
    }

    async fn get_action(&self, action_id: u64) -> Result<Action, DropletError> {
        self.check_failure("get_action", format!("GET /v2/actions/{action_id}"))?;
        *lock(&self.action_polls).entry(action_id).or_insert(0) += 1;

        let status = lock(&self.action_scripts)
            .get_mut(&action_id)
            .and_then(next_scripted)
            .unwrap_or(ActionStatus::Completed);
        let reported_id = lock(&self.action_id_scripts)
            .get_mut(&action_id)
            .and_then(next_scripted)
            .unwrap_or(action_id);
        Ok(Self::action(reported_id, "unknown", status))
    }

    async fn change_kernel(&self, droplet_id: u64, kernel_id: u64) -> Result<Action, DropletError> {
        lock(&self.mutations).push(MutationCall::ChangeKernel { droplet_id, kernel_id });
        self.check_failure("change_kernel", format!("POST /v2/droplets/{droplet_id}/actions"))?;

        // The selected kernel becomes the droplet's current kernel
        let kernel = lock(&self.kernels)
            .get(&droplet_id)
            .and_then(|ks| ks.iter().find(|k| k.id == kernel_id).cloned());
        if let Some(droplet) = lock(&self.droplets).iter_mut().find(|d| d.id == droplet_id) {
            droplet.kernel = kernel;
        }

        let response = lock(&self.change_kernel_responses).get(&droplet_id).cloned();
        Ok(response.unwrap_or_else(|| Self::action(self.next_id(), "change_kernel", ActionStatus::Completed)))
    }

    async fn power_on(&self, droplet_id: u64) -> Result<Action, DropletError> {
        lock(&self.mutations).push(MutationCall::PowerOn { droplet_id });
        self.check_failure("power_on", format!("POST /v2/droplets/{droplet_id}/actions"))?;

        let response = lock(&self.power_on_responses).get(&droplet_id).cloned();
        Ok(response.unwrap_or_else(|| Self::action(self.next_id(), "power_on", ActionStatus::Completed)))
    }
}
