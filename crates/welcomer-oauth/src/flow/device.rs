//! Device Authorization Flow implementation (RFC 8628).

use super::OAuthClient;
use crate::error::{Error, Result};
use crate::token::{ErrorResponse, Token, TokenResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Device authorization response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceAuthorization {
    /// Device code for polling.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where user should go.
    pub verification_uri: String,
    /// Complete verification URI (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Expiration time in seconds.
    pub expires_in: u32,
    /// Polling interval in seconds (minimum 5 seconds).
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Ready-made instructions from the provider (Microsoft sends one).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

const fn default_interval() -> u32 {
    5
}

impl DeviceAuthorization {
    /// Instructions to show the user.
    #[must_use]
    pub fn message(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, use a web browser to open the page {} and enter the code {} to authenticate.",
                self.verification_uri, self.user_code
            )
        })
    }
}

/// Device Authorization Flow for `OAuth2`.
///
/// This flow is suitable for devices with limited input capabilities
/// or no browser (e.g., scheduled jobs on a headless host).
#[derive(Debug)]
pub struct DeviceFlow<'a> {
    client: &'a OAuthClient,
}

impl<'a> DeviceFlow<'a> {
    /// Creates a new device flow.
    #[must_use]
    pub const fn new(client: &'a OAuthClient) -> Self {
        Self { client }
    }

    /// Requests device authorization from the server.
    ///
    /// Returns the device code and user code that should be displayed to the user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceFlowInit`] if the provider does not issue a code,
    /// or an HTTP error if it cannot be reached.
    pub async fn request_device_authorization(
        &self,
        scopes: &[String],
    ) -> Result<DeviceAuthorization> {
        let device_auth_url = self
            .client
            .provider
            .device_auth_url
            .as_ref()
            .ok_or_else(|| {
                Error::DeviceFlowInit(format!(
                    "Provider {} does not support device flow",
                    self.client.provider.name
                ))
            })?;

        let scope_str = OAuthClient::scope_param(scopes);

        let mut params = HashMap::new();
        params.insert("client_id", self.client.client_id.as_str());
        params.insert("scope", &scope_str);

        let response = self
            .client
            .http_client
            .post(device_auth_url.clone())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::DeviceFlowInit(format!("{status}: {body}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::DeviceFlowInit(format!("unexpected response ({e}): {body}")))
    }

    /// Polls for token completion.
    ///
    /// This should be called repeatedly after displaying the user code
    /// until the user completes authorization or the device code expires.
    ///
    /// # Errors
    ///
    /// Returns an error if polling fails. Every provider refusal comes back as
    /// [`Error::OAuth`] with the provider's fields, including the retryable
    /// `authorization_pending` and `slow_down`.
    pub async fn poll_for_token(&self, device_code: &str, interval: Duration) -> Result<Token> {
        tokio::time::sleep(interval).await;

        let mut params = HashMap::new();
        params.insert("grant_type", "urn:ietf:params:oauth:grant-type:device_code");
        params.insert("device_code", device_code);
        params.insert("client_id", &self.client.client_id);

        let response = self
            .client
            .http_client
            .post(self.client.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        token_response.into_token(Utc::now())
    }

    /// Blocks until the user completes sign-in or the device code expires.
    ///
    /// Polls at the interval the provider asked for, adding 5 seconds on
    /// every `slow_down` as RFC 8628 requires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] once `expires_in` has elapsed, or the first
    /// non-retryable error from the token endpoint.
    pub async fn wait_for_token(&self, auth: &DeviceAuthorization) -> Result<Token> {
        let deadline = Instant::now() + Duration::from_secs(u64::from(auth.expires_in));
        let mut interval = Duration::from_secs(u64::from(auth.interval.max(1)));

        loop {
            if Instant::now() + interval > deadline {
                return Err(Error::Timeout(auth.expires_in.into()));
            }

            match self.poll_for_token(&auth.device_code, interval).await {
                Ok(token) => return Ok(token),
                Err(ref e) if e.is_oauth_code("authorization_pending") => {
                    debug!("Device authorization pending");
                }
                Err(ref e) if e.is_oauth_code("slow_down") => {
                    interval += Duration::from_secs(5);
                    debug!("Provider asked to slow down, interval now {interval:?}");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
