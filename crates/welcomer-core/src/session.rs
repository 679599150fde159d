//! Scoped access to the token cache.
//!
//! [`CacheSession::open`] decrypts and loads the cache; [`CacheSession::close`]
//! (or dropping the session) writes back any changes and re-encrypts it.
//! Cache I/O problems are logged and never abort a run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use welcomer_oauth::TokenCache;

use crate::config::Passphrase;
use crate::vault::{self, VaultError};

/// Token cache checked out for the duration of a run.
#[derive(Debug)]
pub struct CacheSession {
    path: PathBuf,
    passphrase: Passphrase,
    cache: TokenCache,
    closed: bool,
}

impl CacheSession {
    /// Decrypts `path.enc` (if present) and loads the cache.
    ///
    /// Falls back to an empty cache when there is nothing to decrypt, the
    /// passphrase is wrong, or the plaintext cannot be parsed.
    #[must_use]
    pub fn open(path: &Path, passphrase: &Passphrase) -> Self {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Cannot create cache directory {}: {e}", parent.display());
            }
        }

        match vault::decrypt(path, passphrase) {
            Ok(()) => info!("Token cache decrypted"),
            Err(VaultError::Missing(source)) => {
                warn!("No encrypted token cache at {}; starting empty", source.display());
            }
            Err(e) => warn!("Could not decrypt token cache, continuing without it: {e}"),
        }

        let cache = TokenCache::load(path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable token cache: {e}");
            TokenCache::default()
        });
        if cache.is_empty() {
            debug!("Token cache holds no accounts");
        }

        Self {
            path: path.to_path_buf(),
            passphrase: passphrase.clone(),
            cache,
            closed: false,
        }
    }

    /// The loaded cache.
    #[must_use]
    pub const fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Mutable access for token acquisition.
    pub const fn cache_mut(&mut self) -> &mut TokenCache {
        &mut self.cache
    }

    /// Persists and re-encrypts the cache.
    pub fn close(mut self) {
        self.persist();
    }

    fn persist(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.cache.has_state_changed() {
            match self.cache.save(&self.path) {
                Ok(()) => info!("Token cache updated"),
                Err(e) => error!("Failed to write token cache: {e}"),
            }
        }

        match vault::encrypt(&self.path, &self.passphrase) {
            Ok(()) => info!("Token cache encrypted"),
            Err(VaultError::Missing(_)) => debug!("No token cache to encrypt"),
            Err(e) => error!("Failed to encrypt token cache: {e}"),
        }
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        self.persist();
    }
}
