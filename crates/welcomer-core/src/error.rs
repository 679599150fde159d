//! Error types for the core library.

use thiserror::Error;

/// Errors that abort a run.
///
/// Recoverable conditions (cache codec failures, a single rejected message)
/// have their own types in [`crate::vault`] and [`crate::dispatch`] and never
/// surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// The CSV feed or an identity endpoint could not be reached.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The CSV feed is malformed.
    #[error("Parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line in the feed, 0 when unknown.
        line: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// The identity provider would not issue a device code.
    #[error("Failed to create device flow: {0}")]
    DeviceFlowInit(String),

    /// Sign-in failed; fields are reported verbatim from the provider.
    #[error("Authentication failed: {error} - {description} (correlation id: {})", .correlation_id.as_deref().unwrap_or("none"))]
    AuthFailed {
        /// Provider error code.
        error: String,
        /// Provider error description.
        description: String,
        /// Provider correlation id.
        correlation_id: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<welcomer_oauth::Error> for Error {
    fn from(err: welcomer_oauth::Error) -> Self {
        use welcomer_oauth::Error as OAuth;

        match err {
            OAuth::Http(e) => Self::Transport(e),
            OAuth::Io(e) => Self::Io(e),
            OAuth::DeviceFlowInit(reason) => Self::DeviceFlowInit(reason),
            OAuth::InvalidConfig(reason) => Self::Config(reason),
            OAuth::UrlError(e) => Self::Config(e.to_string()),
            OAuth::OAuth {
                error,
                description,
                correlation_id,
            } => Self::AuthFailed {
                error,
                description,
                correlation_id,
            },
            OAuth::Timeout(secs) => auth_failed(
                "expired_token",
                format!("Device code expired after {secs} seconds before sign-in completed"),
            ),
            other => auth_failed("invalid_response", other.to_string()),
        }
    }
}

fn auth_failed(error: &str, description: impl Into<String>) -> Error {
    Error::AuthFailed {
        error: error.to_string(),
        description: description.into(),
        correlation_id: None,
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_error_becomes_auth_failed() {
        let err: Error = welcomer_oauth::Error::OAuth {
            error: "invalid_client".into(),
            description: "AADSTS7000218".into(),
            correlation_id: Some("c-1".into()),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "Authentication failed: invalid_client - AADSTS7000218 (correlation id: c-1)"
        );
    }

    #[test]
    fn test_local_deadline_maps_to_expired_token() {
        let err: Error = welcomer_oauth::Error::Timeout(900).into();
        assert!(matches!(
            err,
            Error::AuthFailed { ref error, ref correlation_id, .. }
                if error == "expired_token" && correlation_id.is_none()
        ));
    }

    #[test]
    fn test_provider_expiry_keeps_provider_fields() {
        let err: Error = welcomer_oauth::Error::OAuth {
            error: "expired_token".into(),
            description: "AADSTS70020: code expired".into(),
            correlation_id: Some("corr-10".into()),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "Authentication failed: expired_token - AADSTS70020: code expired (correlation id: corr-10)"
        );
    }

    #[test]
    fn test_device_flow_init_is_preserved() {
        let err: Error = welcomer_oauth::Error::DeviceFlowInit("400: bad scope".into()).into();
        assert!(matches!(err, Error::DeviceFlowInit(ref reason) if reason == "400: bad scope"));
    }
}
