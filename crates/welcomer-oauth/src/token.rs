//! Issued tokens and the token endpoint's reply bodies.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A token this close to expiry is treated as already expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Access token plus what is needed to renew it, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer value sent to Graph.
    pub access_token: String,
    /// Token type, `Bearer` for the identity platform.
    pub token_type: String,
    /// When the access token stops being accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Long-lived token redeemed by the `refresh_token` grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated scopes actually granted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Raw `id_token` JWT, issued when `openid` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl Token {
    /// A bare token with no expiry or refresh token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
            id_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True if the access token can still be sent at `now`.
    ///
    /// Tokens without an expiry never go stale.
    #[must_use]
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_none_or(|exp| now + Duration::seconds(EXPIRY_MARGIN_SECS) < exp)
    }

    /// [`Token::is_usable_at`] for the current time.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// The refresh token, required for the `refresh_token` grant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRefreshToken`] if none was issued.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token.as_deref().ok_or(Error::NoRefreshToken)
    }

    /// Fills in what a refresh reply left out from the token it replaced.
    ///
    /// The identity platform may omit `refresh_token` and `id_token` on refresh;
    /// the previous values stay valid in that case.
    #[must_use]
    pub(crate) fn inherit_from(mut self, previous: &Self) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token.clone_from(&previous.refresh_token);
        }
        if self.id_token.is_none() {
            self.id_token.clone_from(&previous.id_token);
        }
        self
    }
}

/// Successful reply from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    pub token_type: String,
    /// Lifetime in seconds from issue.
    #[serde(default)]
    pub expires_in: Option<u32>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// `OpenID` Connect identity token.
    #[serde(default)]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Converts the reply into a [`Token`], anchoring `expires_in` at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the reply carries no access token.
    pub fn into_token(self, issued_at: DateTime<Utc>) -> Result<Token> {
        if self.access_token.is_empty() {
            return Err(Error::InvalidResponse("empty access_token".into()));
        }

        Ok(Token {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at: self
                .expires_in
                .map(|secs| issued_at + Duration::seconds(i64::from(secs))),
            refresh_token: self.refresh_token,
            scope: self.scope,
            id_token: self.id_token,
        })
    }
}

/// Error reply from the identity platform (`AADSTS...` failures).
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code such as `invalid_grant` or `authorization_declined`.
    pub error: String,
    /// Human-readable description.
    #[serde(default)]
    pub error_description: String,
    /// Correlation id used by the provider to trace the request.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl ErrorResponse {
    /// Converts to [`Error::OAuth`], keeping every field the provider sent.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::OAuth {
            error: self.error,
            description: self.error_description,
            correlation_id: self.correlation_id,
        }
    }
}
