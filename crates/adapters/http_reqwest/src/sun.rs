//! Sun-time source backed by a sunrise-sunset style JSON API.
//!
//! Expected body: `{"results": {"sunrise": "<ISO-8601>", "sunset": "<ISO-8601>"}}`.

use serde::Deserialize;

use switchyard_app::ports::SunTimeSource;
use switchyard_domain::error::HubError;
use switchyard_domain::sun::SunEvents;

use crate::config::SunServiceConfig;
use crate::device_client::HttpDeviceClient;
use crate::error::HttpError;

#[derive(Deserialize)]
struct SunResponse {
    results: SunEvents,
}

/// [`SunTimeSource`] querying one fixed URL.
#[derive(Debug, Clone)]
pub struct SunriseSunsetClient {
    client: reqwest::Client,
    url: String,
}

impl SunriseSunsetClient {
    /// # Errors
    ///
    /// Returns [`HttpError::Build`] when the TLS backend cannot initialise.
    pub fn new(config: &SunServiceConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self::from_reqwest(client, config.url.clone()))
    }

    #[must_use]
    pub fn from_reqwest(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl SunTimeSource for SunriseSunsetClient {
    async fn fetch(&self) -> Result<SunEvents, HubError> {
        let body = HttpDeviceClient::send(self.client.get(&self.url), &self.url).await?;
        let response: SunResponse = HttpDeviceClient::decode(&body, &self.url)?;
        Ok(response.results)
    }
}
