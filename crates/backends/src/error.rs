//! Typed error enum for the provider layer.
//!
//! Filter errors pass through transparently so callers can still match on
//! `InvalidQuery` vs `OperatorNotSupported`; transport failures get their
//! own variants.

use omnivec_core::FilterError;
use thiserror::Error;

/// Provider-layer error covering translation, transport, and decoding.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The filter could not be validated or translated for the target.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Missing or unusable provider configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// SQL / connection / timeout failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP transport failure.
    #[error("http request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Non-success HTTP status from a vector service.
    #[error("http status {code}: {body}")]
    HttpStatus { code: u16, body: String },

    /// Response body could not be parsed.
    #[error("json parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Response was well-formed but semantically unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Whether this error is likely transient (worth retrying upstream).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(e) => matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)),
            Self::HttpRequest(_) => true,
            Self::HttpStatus { code, .. } => matches!(code, 429 | 500 | 502 | 503),
            _ => false,
        }
    }

    /// Whether this error originated in filter validation or translation.
    #[must_use]
    pub const fn is_filter_error(&self) -> bool {
        matches!(self, Self::Filter(_))
    }
}
