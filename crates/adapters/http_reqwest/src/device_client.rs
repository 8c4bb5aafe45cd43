//! Device client: the JSON request/response contract spoken by devices.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | status | `GET /` |
//! | control | `POST /control` with `{"controls": [...]}` |
//! | configure | `POST /configure` with the merged profile |
//! | actions | `GET /reboot`, `/reconfigure`, `/apmode` |

use serde::de::DeserializeOwned;

use switchyard_app::ports::DeviceClient;
use switchyard_domain::control::{ControlCommand, ControlRequest};
use switchyard_domain::device::{DeviceAction, DeviceStatus, Endpoint};
use switchyard_domain::error::HubError;

use crate::config::DeviceHttpConfig;
use crate::error::HttpError;

/// [`DeviceClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    client: reqwest::Client,
}

impl HttpDeviceClient {
    /// Build a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Build`] when the TLS backend cannot initialise.
    pub fn new(config: &DeviceHttpConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Send a request and return the body of a successful response.
    pub(crate) async fn send(
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<String, HttpError> {
        let transport = |source| HttpError::Transport {
            url: url.to_string(),
            source,
        };
        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport)?;
        response.text().await.map_err(transport)
    }

    pub(crate) fn decode<T: DeserializeOwned>(body: &str, url: &str) -> Result<T, HttpError> {
        serde_json::from_str(body).map_err(|source| HttpError::PayloadParse {
            url: url.to_string(),
            source,
        })
    }
}

impl DeviceClient for HttpDeviceClient {
    async fn fetch_status(&self, endpoint: &Endpoint) -> Result<DeviceStatus, HubError> {
        let url = format!("{}/", endpoint.base_url());
        tracing::trace!(%url, "probing device");
        let body = Self::send(self.client.get(&url), &url).await?;
        Ok(Self::decode(&body, &url)?)
    }

    async fn send_controls(
        &self,
        endpoint: &Endpoint,
        commands: &[ControlCommand],
    ) -> Result<DeviceStatus, HubError> {
        let url = format!("{}/control", endpoint.base_url());
        let request = ControlRequest {
            controls: commands.to_vec(),
        };
        let body = Self::send(self.client.post(&url).json(&request), &url).await?;
        Ok(Self::decode(&body, &url)?)
    }

    async fn configure(
        &self,
        endpoint: &Endpoint,
        config: &serde_json::Value,
    ) -> Result<(), HubError> {
        let url = format!("{}/configure", endpoint.base_url());
        Self::send(self.client.post(&url).json(config), &url).await?;
        Ok(())
    }

    async fn send_action(&self, endpoint: &Endpoint, action: DeviceAction) -> Result<(), HubError> {
        let url = format!("{}{}", endpoint.base_url(), action.path());
        Self::send(self.client.get(&url), &url).await?;
        Ok(())
    }
}
