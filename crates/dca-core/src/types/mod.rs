//! Core data types: the persisted target map, resolved asset configuration,
//! and order-execution records.

pub mod target;
pub mod trading;

pub use target::*;
pub use trading::*;
