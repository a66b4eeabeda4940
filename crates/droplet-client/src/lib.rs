//! DigitalOcean REST API Client
//!
//! A Rust client library for the parts of the DigitalOcean v2 API that the
//! kernel upgrade controller drives: droplets, the kernels available to a
//! droplet, and droplet actions (kernel change, power on).
//!
//! # Example
//!
//! ```no_run
//! use droplet_client::{ActionStatus, DropletClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DropletClient::new(
//!     "https://api.digitalocean.com".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! for droplet in client.list_droplets().await? {
//!     let kernels = client.list_kernels(droplet.id).await?;
//!     println!("{} can boot {} kernels", droplet.name, kernels.len());
//! }
//!
//! let action = client.power_on(42).await?;
//! if action.status == ActionStatus::InProgress {
//!     let action = client.get_action(action.id).await?;
//!     println!("power on is {}", action.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Droplets**: List the fleet, fetch a single droplet's power status
//! - **Kernels**: List the kernels a droplet may be switched to
//! - **Actions**: Submit `change_kernel` / `power_on` and poll their status
//! - **Pagination**: Follows `links.pages.next` until the last page
//! - **Mocking**: `MockDropletClient` behind the `test-util` feature

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod droplet_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::DropletClient;
pub use common::{HttpClient, Paginated};
pub use error::DropletError;
pub use models::*;
pub use droplet_trait::DropletClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{MockDropletClient, MutationCall};
