//! Request-based fetches used by the fallback pollers.
//!
//! Each poll is a plain `GET` returning a JSON object or an array of
//! objects, decoded with the same rules as stream frames.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::infrastructure::adapters::decode::decode_any;
use crate::infrastructure::adapters::error::{AdapterError, DecodeError};

/// JSON-over-HTTP client rooted at one service base URL.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    /// Build a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Client` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        with_credentials: bool,
    ) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .cookie_store(with_credentials)
            .build()
            .map_err(|e| AdapterError::Client(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Use an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET` `path` and decode the body into records.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Request` when the request fails or times out,
    /// `AdapterError::Status` for a non-success status and
    /// `AdapterError::Body` when the body is not the expected JSON.
    pub async fn get_records<T: DeserializeOwned>(
        &self,
        path: &str,
        key: Option<&'static str>,
    ) -> Result<Vec<T>, AdapterError> {
        let url = self.url(path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_decode() => {
                return Err(AdapterError::Body {
                    url,
                    source: DecodeError::NotJson,
                });
            }
            Err(e) => {
                return Err(AdapterError::Request {
                    url,
                    reason: e.to_string(),
                });
            }
        };

        decode_any(&body, key).map_err(|source| AdapterError::Body { url, source })
    }
}
