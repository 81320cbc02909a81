//! Typed error definitions shared across the DCA workspace.
//!
//! [`DcaError`] covers failures that originate in core parsing and
//! configuration. Crate-specific seams (exchange gateway, target store,
//! executor, persister) define their own `thiserror` enums; all of them
//! integrate with `anyhow::Result` at the wiring layer.

use thiserror::Error;

/// Domain-specific errors raised by `dca-core`.
#[derive(Debug, Error)]
pub enum DcaError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The persisted target map could not be decoded.
    #[error("malformed target map: {0}")]
    MalformedTargetMap(String),

    /// One target-map entry could not be decoded; siblings are unaffected.
    #[error("invalid target entry {key:?}: {reason}")]
    InvalidEntry { key: String, reason: String },

    /// A schedule string was not `HH:MM`.
    #[error("invalid schedule time {0:?} (expected HH:MM)")]
    InvalidTime(String),

    /// Unknown IANA timezone name.
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
}
