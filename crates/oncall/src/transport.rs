//! Outbound call placement.
//!
//! # Configuration
//!
//! [`QuickCallClient`] needs the provider base URL, an API token and a client
//! id. The token is sent as a bearer token, the client id in the `Client`
//! header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Path of the quick-call endpoint relative to the provider base URL.
const QUICK_CALL_PATH: &str = "/api/v1/call/quickcall";

/// Errors from the call provider.
#[derive(Debug, Error)]
pub enum CallError {
    /// Missing credentials
    #[error("call provider not configured: {0}")]
    NotConfigured(String),

    /// Network failure or timeout
    #[error("call request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with something other than 200
    #[error("call provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Payload submitted for every call attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallData {
    /// Responder being dialed
    pub number: String,
    /// Outgoing line the call is placed from
    pub line_number: String,
    /// SIP account placing the call
    pub sip_id: String,
}

/// Capability to place one outbound call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Submit a call; `Ok` means the provider accepted it.
    async fn place_call(&self, call: &CallData) -> Result<(), CallError>;
}

/// HTTP client for the provider's quick-call API.
#[derive(Debug, Clone)]
pub struct QuickCallClient {
    endpoint: String,
    token: String,
    client_id: String,
    client: reqwest::Client,
}

impl QuickCallClient {
    /// Create a client. `timeout` bounds every request so a hung call cannot
    /// stall the escalation.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CallError> {
        let token = token.into();
        let client_id = client_id.into();

        if token.is_empty() {
            return Err(CallError::NotConfigured("CALL_API_TOKEN".to_string()));
        }
        if client_id.is_empty() {
            return Err(CallError::NotConfigured("CALL_CLIENT_ID".to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: format!("{}{QUICK_CALL_PATH}", base_url.trim_end_matches('/')),
            token,
            client_id,
            client,
        })
    }
}

#[async_trait]
impl CallTransport for QuickCallClient {
    async fn place_call(&self, call: &CallData) -> Result<(), CallError> {
        debug!(number = %call.number, "Submitting quick call");

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("Client", &self.client_id)
            .bearer_auth(&self.token)
            .json(call)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            debug!(number = %call.number, "Quick call accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            number = %call.number,
            status = %status,
            body = %body,
            "Quick call rejected"
        );

        Err(CallError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
