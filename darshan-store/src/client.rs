use std::time::Duration;

use anyhow::bail;
use darshan_logic::{
    Coordinate, InitializeResponse, TargetLocation, TargetStore, TargetUpdate, prelude::*,
};
use log::debug;
use reqwest::{Client, StatusCode};

use crate::server::{SERVER_HTTP_URL, initialize_url, location_url};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// [TargetStore] backed by the location service over HTTP
#[derive(Debug, Clone)]
pub struct HttpTargetStore {
    client: Client,
    base_url: String,
}

impl HttpTargetStore {
    /// Talk to the service this build was configured for
    pub fn new() -> Result<Self> {
        Self::with_base_url(SERVER_HTTP_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Write the hardcoded default record into the store
    pub async fn initialize_default(&self) -> Result<TargetLocation> {
        let url = initialize_url(&self.base_url);
        let resp = self
            .client
            .post(url)
            .send()
            .await
            .context("Could not send request")?
            .error_for_status()
            .context("Server returned error")?
            .json::<InitializeResponse>()
            .await
            .context("Invalid initialize response")?;
        debug!("{}", resp.message);
        Ok(resp.location)
    }
}

impl TargetStore for HttpTargetStore {
    async fn fetch(&self, id: &str) -> Result<Option<TargetLocation>> {
        let url = location_url(&self.base_url, id);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to make request")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let target = resp
            .error_for_status()
            .context("Server returned error")?
            .json::<TargetLocation>()
            .await
            .context("Invalid target record")?;

        if target.id != id {
            bail!("Asked for target {id}, server answered with {}", target.id);
        }

        Ok(Some(target))
    }

    async fn update(
        &self,
        id: &str,
        coordinate: Coordinate,
        address: Option<String>,
    ) -> Result<TargetLocation> {
        let url = location_url(&self.base_url, id);
        let body = TargetUpdate {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            address,
        };

        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("Could not send request")?
            .error_for_status()
            .context("Server returned error")?
            .json::<TargetLocation>()
            .await
            .context("Invalid target record")
    }
}
