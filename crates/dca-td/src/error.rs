//! Gateway error normalization.
//!
//! Every failure talking to the venue ends up as one [`GatewayError`]:
//! either the request never produced a usable answer (transport, HTTP,
//! decode), or the venue answered with its own non-zero error code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// API key or secret not configured; raised before any network call.
    #[error("missing exchange API credentials")]
    MissingCredentials,

    /// Timeout, connection reset, DNS failure, etc.
    #[error("transport error: {0}")]
    Transport(String),

    /// The venue returned an error envelope with a non-zero code.
    #[error("venue error {code}: {message}")]
    Venue { code: i64, message: String },

    /// Non-success HTTP status without a decodable venue envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// The venue error code, if the venue produced one.
    pub fn venue_code(&self) -> Option<i64> {
        match self {
            Self::Venue { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
