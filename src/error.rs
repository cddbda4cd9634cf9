//! Error taxonomy shared by providers, the registry and the request manager.
//!
//! Vendor failures never leave a provider as raw `reqwest` or JSON errors:
//! they are converted into one of the kinds below at the provider boundary,
//! so callers can tell a retryable hiccup from an entitlement problem or a
//! corrupt token.

use reqwest::StatusCode;

use crate::audio::AudioQuality;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A provider could not be built (missing configuration, bad credentials,
    /// unreachable back-end). Recorded by the registry, never fatal.
    #[error("cannot load provider {provider}: {reason}")]
    ProviderLoad { provider: String, reason: String },

    /// The requested provider is not loaded, or no provider is loaded at all.
    #[error("no provider available: {0}")]
    NoProviderAvailable(String),

    /// Negotiation found no format at or below the requested tier.
    #[error("{provider} cannot deliver any format at or below {requested}")]
    NoAcceptableFormat {
        provider: String,
        requested: AudioQuality,
    },

    /// The account is not entitled to the requested quality.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Regional or licensing restriction.
    #[error("track unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Retryable network/TLS failure. Only surfaces to callers when a
    /// provider does not stream through the resumable pipeline.
    #[error("transient transport error: {0}")]
    TransientTransport(String),

    /// Retries exhausted.
    #[error("transport failed after {attempts} attempts: {message}")]
    Transport { attempts: u32, message: String },

    /// The token is not valid base64 or JSON.
    #[error("malformed token: {0}")]
    TokenDecode(String),

    /// The token is well formed but references a provider that is not loaded.
    #[error("token references provider '{0}' which is not loaded")]
    TokenResolution(String),

    /// The vendor answered with something we cannot interpret.
    #[error("unexpected vendor response: {0}")]
    Vendor(String),

    #[error("tagging failed: {0}")]
    Tagging(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the resumable stream should retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientTransport(_))
    }

    /// Classifies a `reqwest` failure.
    ///
    /// Connection, timeout and body errors (dropped TLS sessions, truncated
    /// chunked encoding) are transient; status errors are mapped by code.
    pub fn from_http(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status, err.to_string());
        }

        if err.is_connect() || err.is_timeout() || err.is_body() || err.is_request() {
            return Error::TransientTransport(err.to_string());
        }

        if err.is_decode() {
            return Error::Vendor(err.to_string());
        }

        Error::TransientTransport(err.to_string())
    }

    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS => Error::TransientTransport(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authorization(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => Error::Unavailable(message),
            _ => Error::Vendor(format!("HTTP {status}: {message}")),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Vendor(err.to_string())
    }
}
