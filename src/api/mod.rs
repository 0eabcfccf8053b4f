//! OpenRouter gateway client.
//!
//! One POST per call to the chat-completions endpoint, bearer
//! authenticated. Failures come back typed and are never retried here.

pub mod request;
pub mod response;
pub mod tools;

use crate::error::{VisionError, VisionResult};
use crate::types::config::Config;
use crate::types::message::CompletionRequest;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

/// Sent as `HTTP-Referer` so the gateway can attribute traffic.
pub const REFERER: &str = "https://github.com/openvision-rs/openvision";

/// Sent as `X-Title` so the gateway can attribute traffic.
pub const TITLE: &str = "OpenVision";

/// Client for the gateway's chat-completions endpoint.
pub struct GatewayClient {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
}

impl GatewayClient {
    /// Creates a client for the endpoint and credential in `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(config.api_key.expose_secret()),
            endpoint: config.chat_completions_url(),
        }
    }

    /// Creates a client against an explicit base URL.
    ///
    /// `base_url` is the API root; `/chat/completions` is appended.
    #[must_use]
    pub fn new_with_base_url(api_key: SecretString, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        }
    }

    /// Returns the full endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `request` and returns the parsed JSON body.
    ///
    /// # Errors
    ///
    /// - [`VisionError::Network`] if the gateway cannot be reached
    /// - [`VisionError::Gateway`] for any status other than 200, carrying the
    ///   body text verbatim
    /// - [`VisionError::Decode`] if a 200 body is not JSON
    pub async fn complete(&self, request: &CompletionRequest) -> VisionResult<Value> {
        debug!(model = %request.model, endpoint = %self.endpoint, "sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(request)
            .send()
            .await
            .map_err(|e| VisionError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VisionError::Network(e.to_string()))?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "gateway returned an error");
            return Err(VisionError::gateway(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| VisionError::Decode(e.to_string()))
    }
}
