//! Run configuration.
//!
//! Everything a run needs is resolved once at startup into a
//! [`RunConfiguration`] and passed by reference from then on.

use std::fmt;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use url::Url;
use welcomer_oauth::Provider;

use crate::error::{Error, Result};

/// Environment variable holding the directory (tenant) id.
pub const ENV_TENANT_ID: &str = "TENANT_ID";
/// Environment variable holding the application (client) id.
pub const ENV_APP_ID: &str = "APP_ID";
/// Environment variable holding the client secret.
pub const ENV_SECRET: &str = "SECRET";
/// Environment variable holding the token cache passphrase.
pub const ENV_PASSPHRASE: &str = "DEV_PASS";

/// Graph endpoint that sends mail as the signed-in user.
pub const DEFAULT_SEND_MAIL_ENDPOINT: &str = "https://graph.microsoft.com/v1.0/me/sendMail";
/// Site whose new hires are greeted.
pub const DEFAULT_SITE_LOCATION: &str = "Redwood City";
/// Distribution list that receives delivery reports.
pub const DEFAULT_REPORT_RECIPIENT: &str = "ears-siteit-dev@ea.com";

/// Delegated Graph permissions the run needs.
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://graph.microsoft.com/Mail.Send",
    "https://graph.microsoft.com/User.Read",
];

/// Passphrase for the token cache. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wraps a passphrase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(****)")
    }
}

/// Secrets and identifiers that must come from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Application (client) id.
    pub client_id: String,
    /// Client secret from the app registration.
    pub client_secret: String,
    /// Passphrase for the token cache at rest.
    pub passphrase: Passphrase,
}

impl Credentials {
    /// Reads credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming every variable that is missing or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads credentials through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming every variable that is missing or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut missing = Vec::new();
        let mut read = |key: &'static str| {
            let value = lookup(key).filter(|v| !v.is_empty());
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or_default()
        };

        let tenant_id = read(ENV_TENANT_ID);
        let client_id = read(ENV_APP_ID);
        let client_secret = read(ENV_SECRET);
        let passphrase = read(ENV_PASSPHRASE);

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            passphrase: Passphrase::new(passphrase),
        })
    }
}

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Application (client) id.
    pub client_id: String,
    /// Authority URL, `https://login.microsoftonline.com/<tenant>`.
    pub authority: Url,
    /// Client secret from the app registration.
    pub client_secret: String,
    /// Scopes requested for the mail token.
    pub scopes: Vec<String>,
    /// Mail send endpoint.
    pub endpoint: Url,
    /// CSV feed of new hires.
    pub csv_url: Url,
    /// Only hires at this location are greeted.
    pub site_location: String,
    /// Only hires starting on this date are greeted.
    pub reference_date: NaiveDate,
    /// Plaintext token cache path; the ciphertext lives next to it.
    pub cache_path: PathBuf,
    /// Passphrase for the token cache at rest.
    pub passphrase: Passphrase,
    /// Distribution address for delivery reports.
    pub report_recipient: String,
    /// Cached username to sign in as, when several are cached.
    pub preferred_account: Option<String>,
}

impl RunConfiguration {
    /// Builds a configuration with defaults for everything but credentials and feed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the tenant or feed URL is invalid.
    pub fn new(credentials: Credentials, csv_url: &str) -> Result<Self> {
        let authority = Provider::microsoft(&credentials.tenant_id)?.authority;

        Ok(Self {
            client_id: credentials.client_id,
            authority,
            client_secret: credentials.client_secret,
            scopes: DEFAULT_SCOPES.iter().map(ToString::to_string).collect(),
            endpoint: parse_url("endpoint", DEFAULT_SEND_MAIL_ENDPOINT)?,
            csv_url: parse_url("csv url", csv_url)?,
            site_location: DEFAULT_SITE_LOCATION.to_string(),
            reference_date: Local::now().date_naive(),
            cache_path: default_cache_path(),
            passphrase: credentials.passphrase,
            report_recipient: DEFAULT_REPORT_RECIPIENT.to_string(),
            preferred_account: None,
        })
    }

    /// Sets the site location.
    #[must_use]
    pub fn with_site_location(mut self, location: impl Into<String>) -> Self {
        self.site_location = location.into();
        self
    }

    /// Sets the start date to match.
    #[must_use]
    pub const fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// Sets the plaintext cache path.
    #[must_use]
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Sets the report distribution address.
    #[must_use]
    pub fn with_report_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.report_recipient = recipient.into();
        self
    }

    /// Sets the cached username to prefer.
    #[must_use]
    pub fn with_preferred_account(mut self, username: Option<String>) -> Self {
        self.preferred_account = username.filter(|u| !u.is_empty());
        self
    }

    /// Sets the mail send endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        self.endpoint = parse_url("endpoint", endpoint)?;
        Ok(self)
    }

    /// The reference date as it appears in the feed (`YYYY-MM-DD`).
    #[must_use]
    pub fn reference_date_str(&self) -> String {
        self.reference_date.format("%Y-%m-%d").to_string()
    }
}

/// `<data dir>/welcomer/token_cache.json`, or the working directory if there is no data dir.
#[must_use]
pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("welcomer")
        .join("token_cache.json")
}

fn parse_url(what: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::Config(format!("invalid {what} '{value}': {e}")))
}
