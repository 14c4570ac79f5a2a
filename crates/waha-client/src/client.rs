//! WAHA gateway HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::WahaConfig;
use crate::error::GatewayError;
use crate::types::{extract_error_message, extract_message_id, SendOutcome, SendTextRequest};

/// Transport timeout for a single gateway call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for sending messages through a WAHA gateway.
#[derive(Clone)]
pub struct WahaClient {
    http: Client,
    config: WahaConfig,
}

impl WahaClient {
    /// Build a client for the given gateway.
    pub fn new(config: WahaConfig) -> Result<Self, GatewayError> {
        if config.base_url.trim().is_empty() {
            return Err(GatewayError::Config("gateway base URL is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self { http, config })
    }

    /// Send a text message to a phone number.
    ///
    /// Never fails: transport errors, non-2xx answers and unreadable bodies
    /// all come back as [`SendOutcome::Failed`].
    pub async fn send_text(&self, phone: &str, text: &str) -> SendOutcome {
        let request = SendTextRequest::new(phone, text, self.config.session.clone());
        match self.post_send_text(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(chat_id = %request.chat_id, error = %e, "Gateway request failed");
                SendOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &WahaConfig {
        &self.config
    }

    async fn post_send_text(&self, request: &SendTextRequest) -> Result<SendOutcome, GatewayError> {
        let url = self.config.send_text_url();
        debug!(chat_id = %request.chat_id, "POST {}", url);

        let mut builder = self.http.post(&url).json(request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.header("X-Api-Key", key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let raw = response.text().await?;
        let body = parse_body(&raw);

        if !status.is_success() {
            let error = body
                .as_ref()
                .and_then(extract_error_message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Ok(SendOutcome::Failed { error });
        }

        let message_id = match body {
            Some(ref value) => extract_message_id(value),
            None => {
                debug!(body = %raw, "Gateway answered with a non-JSON body");
                None
            }
        };

        Ok(SendOutcome::Sent { message_id })
    }
}

fn parse_body(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    serde_json::from_str(raw).ok()
}

impl std::fmt::Debug for WahaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WahaClient")
            .field("config", &self.config)
            .finish()
    }
}
