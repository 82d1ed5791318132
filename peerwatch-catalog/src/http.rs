//! Shared HTTP plumbing for catalog requests.

use peerwatch_core::config::CatalogConfig;
use serde::de::DeserializeOwned;

use crate::errors::CatalogError;

/// Builds a client applying the configured timeout and user agent.
///
/// # Errors
/// - `CatalogError::NetworkError` - TLS backend could not be initialised
pub(crate) fn build_client(config: &CatalogConfig) -> Result<reqwest::Client, CatalogError> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent)
        .build()
        .map_err(CatalogError::from)
}

/// Sends a GET request and decodes the JSON body.
///
/// Non-success statuses become `CatalogUnavailable` with the message
/// `error_message` extracts from the body.
///
/// # Errors
/// - `CatalogError::NetworkError` - Request failed or timed out
/// - `CatalogError::CatalogUnavailable` - Server answered with an error status
/// - `CatalogError::ParseError` - Body is not the expected JSON
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    params: &[(&str, String)],
    error_message: fn(&str) -> String,
) -> Result<T, CatalogError> {
    tracing::debug!("GET {} {:?}", url, params);

    let response = client.get(url).query(params).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = error_message(&body);
        tracing::warn!("Request to {} failed with {}: {}", url, status, message);
        return Err(CatalogError::CatalogUnavailable {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| CatalogError::ParseError {
        reason: format!("{url}: {e}"),
    })
}
