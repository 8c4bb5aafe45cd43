//! HTTP adapter error types.

use switchyard_domain::error::HubError;

/// Errors specific to the HTTP client adapter.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    /// Connection failure, timeout or error status.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the expected JSON.
    #[error("unexpected response body from {url}")]
    PayloadParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl HttpError {
    /// Convert into a [`HubError::Device`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> HubError {
        HubError::Device(Box::new(self))
    }
}

impl From<HttpError> for HubError {
    fn from(err: HttpError) -> Self {
        err.into_domain()
    }
}
