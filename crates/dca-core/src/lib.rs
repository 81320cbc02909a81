//! # dca-core
//!
//! Core crate for the DCA system, providing:
//!
//! - **Types** (`types`): target map, resolved asset config, fills, order records
//! - **Configuration** (`config`): JSON config + environment overlay
//! - **Error types** (`error`): domain-specific `DcaError` via thiserror
//! - **Time utilities** (`time_util`): trading-timezone clock
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
