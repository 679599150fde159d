//! `OAuth2` provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Base authority host for the Microsoft identity platform.
pub const MICROSOFT_LOGIN_HOST: &str = "https://login.microsoftonline.com";

/// Scopes the identity platform needs to issue an `id_token` and a refresh token.
///
/// These are appended to every device flow request so that the account can be
/// cached and refreshed on the next run.
pub const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Microsoft").
    pub name: String,
    /// Authority the endpoints hang off, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Device authorization endpoint (if supported).
    pub device_auth_url: Option<Url>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        authority: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            authority: Url::parse(authority.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            device_auth_url: None,
        })
    }

    /// Sets the device authorization URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_device_auth_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.device_auth_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Builds a Microsoft identity platform (v2.0) provider from an authority URL.
    ///
    /// The token and device code endpoints are `{authority}/oauth2/v2.0/token`
    /// and `{authority}/oauth2/v2.0/devicecode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority is not a valid URL.
    pub fn from_authority(authority: impl AsRef<str>) -> Result<Self> {
        let authority = authority.as_ref().trim_end_matches('/');
        Self::new(
            "Microsoft",
            authority,
            format!("{authority}/oauth2/v2.0/token"),
        )?
        .with_device_auth_url(format!("{authority}/oauth2/v2.0/devicecode"))
    }

    /// Microsoft identity platform provider for a single tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant id is empty or produces an invalid URL.
    pub fn microsoft(tenant_id: &str) -> Result<Self> {
        if tenant_id.trim().is_empty() {
            return Err(Error::InvalidConfig("tenant id is empty".into()));
        }
        Self::from_authority(format!("{MICROSOFT_LOGIN_HOST}/{tenant_id}"))
    }
}
