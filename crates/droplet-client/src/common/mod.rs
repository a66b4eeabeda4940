//! Common utilities for the DigitalOcean API client
//!
//! Provides the authenticated HTTP wrapper and pagination handling shared by
//! every endpoint.

use crate::error::DropletError;
use crate::models::{DropletsPage, KernelsPage};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Status codes accepted for reads
pub const READ_OK: &[u16] = &[200];

/// Status codes accepted when submitting an action
pub const ACTION_ACCEPTED: &[u16] = &[200, 201];

/// A list response page: its items plus the URL of the next page, if any
pub trait Paginated: DeserializeOwned {
    /// Element type of the page
    type Item;

    /// Split the page into its items and the next page URL
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

impl Paginated for DropletsPage {
    type Item = crate::models::Droplet;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.droplets, self.links.pages.and_then(|p| p.next))
    }
}

impl Paginated for KernelsPage {
    type Item = crate::models::Kernel;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>) {
        (self.kernels, self.links.pages.and_then(|p| p.next))
    }
}

/// HTTP client wrapper with bearer authentication
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Resolve a `links.pages.next` value. Absolute links must stay under
    /// `base_url`, since the bearer token is sent with every page request.
    fn next_page_url(&self, next: &str) -> Result<String, DropletError> {
        if !next.starts_with("http") {
            return Ok(self.build_url(next));
        }
        let under_base = next
            .strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']));
        if under_base {
            Ok(next.to_string())
        } else {
            Err(DropletError::InvalidRequest(format!(
                "refusing to follow pagination link outside {}: {}",
                self.base_url, next
            )))
        }
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Turn a response into its decoded body, or an `Api` error carrying the
    /// raw body when the status is not in `accepted`.
    async fn decode<T: DeserializeOwned>(
        request: String,
        response: Response,
        accepted: &[u16],
    ) -> Result<T, DropletError> {
        let status = response.status().as_u16();
        let body = response.text().await?;

        if !accepted.contains(&status) {
            return Err(DropletError::Api { request, status, body });
        }

        serde_json::from_str(&body).map_err(|e| {
            debug!(
                "error decoding response body for {}: {} - Response (first 500 chars): {}",
                request,
                e,
                body.chars().take(500).collect::<String>()
            );
            DropletError::Serialization(e)
        })
    }

    /// Fetch all pages of a paginated response, starting at `path`
    pub async fn fetch_all_pages<P: Paginated>(
        &self,
        path: &str,
    ) -> Result<Vec<P::Item>, DropletError> {
        let mut all_results = Vec::new();
        let mut url = self.build_url(path);

        loop {
            debug!("Fetching page: {}", url);
            let page: P = self.get_url(&url, READ_OK).await?;
            let (items, next) = page.into_parts();
            all_results.extend(items);

            match next {
                Some(next_url) => url = self.next_page_url(&next_url)?,
                None => break,
            }
        }

        Ok(all_results)
    }

    /// Make a GET request, accepting only the given status codes
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        accepted: &[u16],
    ) -> Result<T, DropletError> {
        self.get_url(&self.build_url(path), accepted).await
    }

    async fn get_url<T: DeserializeOwned>(
        &self,
        url: &str,
        accepted: &[u16],
    ) -> Result<T, DropletError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(DropletError::Http)?;

        Self::decode(format!("GET {url}"), response, accepted).await
    }

    /// Make a POST request with a JSON body, accepting only the given status codes
    pub async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        accepted: &[u16],
    ) -> Result<T, DropletError> {
        let url = self.build_url(path);
        debug!(
            "POST {} with body: {}",
            url,
            serde_json::to_string(body).unwrap_or_default()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(DropletError::Http)?;

        Self::decode(format!("POST {url}"), response, accepted).await
    }
}
