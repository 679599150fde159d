//! Serializable token cache.
//!
//! Holds one entry per signed-in account. The cache tracks whether it was
//! modified so callers only write it back when something changed.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::token::Token;

/// Current on-disk format version.
const CACHE_VERSION: u32 = 1;

/// An account the cache holds tokens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    /// Sign-in name (e.g. `someone@contoso.com`).
    pub username: String,
    /// Provider-stable account key, `<oid>.<tid>`.
    pub home_account_id: String,
    /// Most recent token issued for this account.
    pub token: Token,
}

/// In-memory token cache that can be persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    accounts: Vec<CachedAccount>,
    #[serde(skip)]
    changed: bool,
}

const fn default_version() -> u32 {
    CACHE_VERSION
}

impl Default for TokenCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            accounts: Vec::new(),
            changed: false,
        }
    }
}

impl TokenCache {
    /// Parses a cache from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid cache document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the cache to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads the cache from `path`, or returns an empty cache if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                info!("Token cache exists at {}", path.display());
                Self::from_json(&text)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No token cache at {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the cache to `path` and clears the changed flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        self.changed = false;
        debug!("Token cache written to {}", path.display());
        Ok(())
    }

    /// Accounts in insertion order.
    #[must_use]
    pub fn accounts(&self) -> &[CachedAccount] {
        &self.accounts
    }

    /// Returns true when the cache holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Returns true if the cache was modified since it was loaded or saved.
    #[must_use]
    pub const fn has_state_changed(&self) -> bool {
        self.changed
    }

    /// Inserts an account, replacing any entry with the same `home_account_id`.
    ///
    /// A replaced entry keeps its position so account order stays stable.
    pub fn upsert(&mut self, account: CachedAccount) {
        match self
            .accounts
            .iter_mut()
            .find(|a| a.home_account_id == account.home_account_id)
        {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
        self.changed = true;
    }

    /// Replaces the token stored for an account. Returns false if the account is unknown.
    pub fn update_token(&mut self, home_account_id: &str, token: Token) -> bool {
        let Some(account) = self
            .accounts
            .iter_mut()
            .find(|a| a.home_account_id == home_account_id)
        else {
            return false;
        };
        account.token = token;
        self.changed = true;
        true
    }
}
