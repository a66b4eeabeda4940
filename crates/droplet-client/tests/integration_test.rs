//! Integration tests for the DigitalOcean client
//!
//! These tests require a real DigitalOcean account and only perform reads.
//! Set DIGITALOCEAN_TOKEN (and optionally DIGITALOCEAN_API_URL) to run.

use droplet_client::DropletClient;

fn live_client() -> DropletClient {
    let url = std::env::var("DIGITALOCEAN_API_URL")
        .unwrap_or_else(|_| "https://api.digitalocean.com".to_string());
    let token = std::env::var("DIGITALOCEAN_TOKEN")
        .expect("DIGITALOCEAN_TOKEN environment variable must be set");

    DropletClient::new(url, token).expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires a DigitalOcean account
async fn test_validate_token() {
    let client = live_client();
    client.validate_token().await.expect("Token should be valid");
}

#[tokio::test]
#[ignore]
async fn test_list_droplets_and_kernels() {
    let client = live_client();

    let droplets = client.list_droplets().await
        .expect("Failed to list droplets");
    println!("Found {} droplets", droplets.len());

    if let Some(droplet) = droplets.first() {
        let kernels = client.list_kernels(droplet.id).await
            .expect("Failed to list kernels");
        println!("Droplet {} has {} kernels available", droplet.name, kernels.len());

        let fetched = client.get_droplet(droplet.id).await
            .expect("Failed to get droplet");
        assert_eq!(fetched.id, droplet.id);
    }
}
