//! Outbound HTTP integrations
//!
//! One request per call, no retries. Response bodies are parsed by pure
//! functions so they can be tested without a network.

pub mod hubspot;
pub mod maps;

use crate::error::{EstimatorError, Result};
use reqwest::Client;
use std::time::Duration;

pub use hubspot::{CustomerRecord, HubSpotClient};
pub use maps::{MapsClient, RouteEstimate};

pub(crate) fn http_client(timeout_seconds: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.max(1)))
        .build()?)
}

/// Body text of a successful response, or `Api` error with status and body
pub(crate) async fn response_text(service: &'static str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await?;

    tracing::debug!("{} response status: {}", service, status);
    tracing::debug!("{} response body: {}", service, text);

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(EstimatorError::Api {
            service,
            reason: format!("authentication failed (HTTP {})", status.as_u16()),
        });
    }
    if !status.is_success() {
        return Err(EstimatorError::Api {
            service,
            reason: format!("HTTP {}: {}", status, text),
        });
    }
    Ok(text)
}
