//! Public client application bound to a token cache.

use tracing::{debug, info, warn};

use crate::cache::{CachedAccount, TokenCache};
use crate::claims::IdTokenClaims;
use crate::error::{Error, Result};
use crate::flow::{DeviceAuthorization, DeviceFlow, OAuthClient};
use crate::token::Token;

/// Cache key used when the provider issued no `id_token`.
const ANONYMOUS_ACCOUNT: &str = "anonymous";

/// A public (device) client whose tokens live in a [`TokenCache`].
///
/// Silent acquisition and the device flow both write through to the cache,
/// which the caller owns and persists.
#[derive(Debug)]
pub struct PublicClientApp<'c> {
    client: OAuthClient,
    cache: &'c mut TokenCache,
}

impl<'c> PublicClientApp<'c> {
    /// Creates an app backed by `cache`.
    pub fn new(client: OAuthClient, cache: &'c mut TokenCache) -> Self {
        Self { client, cache }
    }

    /// Accounts currently known to the cache.
    #[must_use]
    pub fn accounts(&self) -> &[CachedAccount] {
        self.cache.accounts()
    }

    /// Tries to obtain a token for `account` without user interaction.
    ///
    /// Returns the cached access token while it is valid, otherwise redeems the
    /// refresh token. `Ok(None)` means the cache cannot satisfy the request and
    /// an interactive flow is needed.
    ///
    /// # Errors
    ///
    /// Returns transport or parsing errors from the token endpoint. Errors the
    /// provider reports for the grant itself (e.g. `invalid_grant`) are a miss.
    pub async fn acquire_token_silent(
        &mut self,
        scopes: &[String],
        account: &CachedAccount,
    ) -> Result<Option<Token>> {
        let Some(cached) = self
            .cache
            .accounts()
            .iter()
            .find(|a| a.home_account_id == account.home_account_id)
        else {
            debug!("Account {} is no longer cached", account.username);
            return Ok(None);
        };

        if cached.token.is_usable() {
            debug!("Cached access token for {} is still valid", cached.username);
            return Ok(Some(cached.token.clone()));
        }

        if cached.token.refresh_token.is_none() {
            debug!("Cached token for {} has no refresh token", cached.username);
            return Ok(None);
        }

        let stale = cached.token.clone();
        match self.client.refresh_token(&stale, scopes).await {
            Ok(token) => {
                info!("Refreshed access token for {}", account.username);
                self.cache
                    .update_token(&account.home_account_id, token.clone());
                Ok(Some(token))
            }
            Err(Error::OAuth {
                error, description, ..
            }) => {
                warn!("Refresh for {} rejected: {error} - {description}", account.username);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Starts a device flow and returns the code the user must enter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceFlowInit`] if the provider does not issue a code.
    pub async fn initiate_device_flow(&self, scopes: &[String]) -> Result<DeviceAuthorization> {
        DeviceFlow::new(&self.client)
            .request_device_authorization(scopes)
            .await
    }

    /// Waits for the user to finish the device flow and caches the result.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if sign-in is declined, fails or expires.
    pub async fn acquire_token_by_device_flow(
        &mut self,
        auth: &DeviceAuthorization,
    ) -> Result<Token> {
        let token = DeviceFlow::new(&self.client).wait_for_token(auth).await?;
        self.remember(&token);
        Ok(token)
    }

    fn remember(&mut self, token: &Token) {
        let claims = match token.id_token.as_deref().map(IdTokenClaims::decode) {
            Some(Ok(claims)) => claims,
            Some(Err(e)) => {
                warn!("Could not read id_token claims: {e}");
                IdTokenClaims::default()
            }
            None => {
                warn!("Provider issued no id_token; caching token anonymously");
                IdTokenClaims::default()
            }
        };

        let username = claims
            .preferred_username
            .clone()
            .unwrap_or_else(|| ANONYMOUS_ACCOUNT.to_string());
        let home_account_id = claims.home_account_id().unwrap_or_else(|| username.clone());

        info!("Caching token for {username}");
        self.cache.upsert(CachedAccount {
            username,
            home_account_id,
            token: token.clone(),
        });
    }
}
