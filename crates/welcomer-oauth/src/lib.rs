//! # welcomer-oauth
//!
//! `OAuth2` client for the Microsoft identity platform, tuned for unattended
//! daily jobs that authenticate as a signed-in user.
//!
//! ## Features
//!
//! - **Device Flow** (RFC 8628) for headless hosts
//! - **Silent acquisition** from a serializable token cache, with refresh
//! - **Provider configuration** derived from a tenant authority URL
//! - **Account discovery** from `id_token` claims
//!
//! ## Quick Start
//!
//! ```ignore
//! use welcomer_oauth::{OAuthClient, Provider, PublicClientApp, TokenCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::from_authority("https://login.microsoftonline.com/contoso")?;
//!     let client = OAuthClient::new("your_client_id", provider);
//!     let mut cache = TokenCache::default();
//!     let mut app = PublicClientApp::new(client, &mut cache);
//!     let scopes = vec!["https://graph.microsoft.com/Mail.Send".to_string()];
//!
//!     let token = match app.accounts().first().cloned() {
//!         Some(account) => app.acquire_token_silent(&scopes, &account).await?,
//!         None => None,
//!     };
//!
//!     let token = match token {
//!         Some(token) => token,
//!         None => {
//!             let auth = app.initiate_device_flow(&scopes).await?;
//!             println!("{}", auth.message());
//!             app.acquire_token_by_device_flow(&auth).await?
//!         }
//!     };
//!
//!     println!("Access token: {}", token.access_token);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod cache;
pub mod claims;
mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use app::PublicClientApp;
pub use cache::{CachedAccount, TokenCache};
pub use claims::IdTokenClaims;
pub use error::{Error, Result};
pub use flow::{DeviceAuthorization, DeviceFlow, OAuthClient};
pub use provider::Provider;
pub use token::Token;
