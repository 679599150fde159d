//! `OAuth2` grant flows.

mod device;

pub use device::{DeviceAuthorization, DeviceFlow};

use crate::error::Result;
use crate::provider::{Provider, RESERVED_SCOPES};
use crate::token::{ErrorResponse, Token, TokenResponse};
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;

/// Public `OAuth2` client configuration.
///
/// Public clients never present a client secret.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            provider,
            http_client: Client::new(),
        }
    }

    /// Reuses an existing HTTP client instead of creating a new one.
    #[must_use]
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Space-joined scope string for a request, including the reserved
    /// `OpenID` scopes.
    pub(crate) fn scope_param(scopes: &[String]) -> String {
        let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
        for reserved in RESERVED_SCOPES {
            if !all.contains(&reserved) {
                all.push(reserved);
            }
        }
        all.join(" ")
    }

    /// Refreshes an access token using a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token, scopes: &[String]) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        let scope = Self::scope_param(scopes);

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);
        params.insert("scope", &scope);

        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(token_response.into_token(Utc::now())?.inherit_from(token))
    }
}
