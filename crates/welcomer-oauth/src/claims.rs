//! Identity claims carried in an `OpenID` Connect `id_token`.
//!
//! The token is decoded, not verified. Claims only label cache entries.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Subset of `id_token` claims used to identify a cached account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdTokenClaims {
    /// Sign-in name, usually the user principal name.
    #[serde(default)]
    pub preferred_username: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Object id of the user.
    #[serde(default)]
    pub oid: Option<String>,
    /// Tenant id.
    #[serde(default)]
    pub tid: Option<String>,
    /// Subject, used when `oid` is absent.
    #[serde(default)]
    pub sub: Option<String>,
}

impl IdTokenClaims {
    /// Decodes the payload segment of a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the token is not a three-part JWT
    /// or its payload is not base64url JSON.
    pub fn decode(id_token: &str) -> Result<Self> {
        let mut parts = id_token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => return Err(Error::InvalidResponse("id_token is not a JWT".into())),
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| Error::InvalidResponse(format!("id_token payload: {e}")))?;

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Stable account key in the form `<oid>.<tid>`.
    #[must_use]
    pub fn home_account_id(&self) -> Option<String> {
        let object = self.oid.as_ref().or(self.sub.as_ref())?;
        Some(match &self.tid {
            Some(tid) => format!("{object}.{tid}"),
            None => object.clone(),
        })
    }
}
