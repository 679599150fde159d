//! Bearer token acquisition.
//!
//! ```text
//! NoCache -> CacheLoaded -> SilentHit  -> TokenReady
//!                        -> SilentMiss -> DeviceFlowPending -> TokenReady
//!                                                           -> AuthFailed
//! ```

use std::fmt;

use tracing::{debug, error, info, warn};
use welcomer_oauth::{CachedAccount, DeviceAuthorization, PublicClientApp, Token};

use crate::error::Result;

/// States of a token acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Nothing loaded yet.
    NoCache,
    /// Cache loaded (possibly empty).
    CacheLoaded,
    /// A cached or refreshed token is usable.
    SilentHit,
    /// The cache could not provide a token.
    SilentMiss,
    /// Waiting for the user to finish signing in.
    DeviceFlowPending,
    /// A bearer token is available.
    TokenReady,
    /// Sign-in failed.
    AuthFailed,
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoCache => "no-cache",
            Self::CacheLoaded => "cache-loaded",
            Self::SilentHit => "silent-hit",
            Self::SilentMiss => "silent-miss",
            Self::DeviceFlowPending => "device-flow-pending",
            Self::TokenReady => "token-ready",
            Self::AuthFailed => "auth-failed",
        };
        f.write_str(name)
    }
}

/// Identity operations token acquisition relies on.
#[allow(async_fn_in_trait)]
pub trait Authenticator {
    /// Cached accounts in cache order.
    fn accounts(&self) -> Vec<CachedAccount>;

    /// Token for `account` without user interaction; `Ok(None)` on a miss.
    async fn acquire_token_silent(
        &mut self,
        scopes: &[String],
        account: &CachedAccount,
    ) -> welcomer_oauth::Result<Option<Token>>;

    /// Requests a device code.
    async fn initiate_device_flow(
        &self,
        scopes: &[String],
    ) -> welcomer_oauth::Result<DeviceAuthorization>;

    /// Blocks until the device flow completes.
    async fn acquire_token_by_device_flow(
        &mut self,
        auth: &DeviceAuthorization,
    ) -> welcomer_oauth::Result<Token>;
}

impl Authenticator for PublicClientApp<'_> {
    fn accounts(&self) -> Vec<CachedAccount> {
        PublicClientApp::accounts(self).to_vec()
    }

    async fn acquire_token_silent(
        &mut self,
        scopes: &[String],
        account: &CachedAccount,
    ) -> welcomer_oauth::Result<Option<Token>> {
        PublicClientApp::acquire_token_silent(self, scopes, account).await
    }

    async fn initiate_device_flow(
        &self,
        scopes: &[String],
    ) -> welcomer_oauth::Result<DeviceAuthorization> {
        PublicClientApp::initiate_device_flow(self, scopes).await
    }

    async fn acquire_token_by_device_flow(
        &mut self,
        auth: &DeviceAuthorization,
    ) -> welcomer_oauth::Result<Token> {
        PublicClientApp::acquire_token_by_device_flow(self, auth).await
    }
}

/// Picks the cached account to sign in as.
///
/// With a preferred username, only that account (compared ignoring ASCII
/// case) is eligible. Otherwise the first cached account is used.
#[must_use]
pub fn select_account<'a>(
    accounts: &'a [CachedAccount],
    preferred: Option<&str>,
) -> Option<&'a CachedAccount> {
    match preferred {
        Some(username) => {
            let found = accounts
                .iter()
                .find(|a| a.username.eq_ignore_ascii_case(username));
            if found.is_none() {
                warn!("Preferred account {username} is not in the token cache");
            }
            found
        }
        None => accounts.first(),
    }
}

/// Obtains a bearer token, silently if possible, else through the device flow.
///
/// `prompt` receives the device code instructions; it is only called when
/// user interaction is required.
///
/// # Errors
///
/// Returns [`crate::Error::DeviceFlowInit`] if no device code is issued,
/// [`crate::Error::AuthFailed`] if sign-in fails, and
/// [`crate::Error::Transport`] if the provider is unreachable.
pub async fn acquire_token<A: Authenticator>(
    app: &mut A,
    scopes: &[String],
    preferred_account: Option<&str>,
    prompt: impl FnOnce(&DeviceAuthorization),
) -> Result<String> {
    let mut state = AcquisitionState::NoCache;
    transition(&mut state, AcquisitionState::CacheLoaded);

    let accounts = app.accounts();
    let mut token = None;

    if accounts.is_empty() {
        debug!("Token cache holds no accounts");
    } else {
        info!("Account(s) exist in cache, trying silent sign-in");
        for account in &accounts {
            info!("  cached account: {}", account.username);
        }
        if let Some(chosen) = select_account(&accounts, preferred_account) {
            if preferred_account.is_none() && accounts.len() > 1 {
                info!("No preferred account configured, using {}", chosen.username);
            }
            token = app.acquire_token_silent(scopes, chosen).await?;
        }
    }

    if let Some(token) = token {
        transition(&mut state, AcquisitionState::SilentHit);
        transition(&mut state, AcquisitionState::TokenReady);
        return Ok(token.access_token);
    }

    transition(&mut state, AcquisitionState::SilentMiss);
    info!("No suitable token exists in cache, starting device flow");

    let auth = app.initiate_device_flow(scopes).await.inspect_err(|e| {
        error!("Device flow could not start: {e}");
    })?;
    prompt(&auth);
    transition(&mut state, AcquisitionState::DeviceFlowPending);

    match app.acquire_token_by_device_flow(&auth).await {
        Ok(token) => {
            transition(&mut state, AcquisitionState::TokenReady);
            Ok(token.access_token)
        }
        Err(e) => {
            transition(&mut state, AcquisitionState::AuthFailed);
            Err(e.into())
        }
    }
}

fn transition(state: &mut AcquisitionState, next: AcquisitionState) {
    debug!("Token acquisition: {state} -> {next}");
    *state = next;
}
