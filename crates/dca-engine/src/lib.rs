//! # dca-engine
//!
//! Scheduling, idempotency and execution logic for the DCA runner.
//!
//! ## Architecture
//!
//! A [`cycle::DcaCycle`] reads the target map from a [`store::TargetStore`],
//! then walks every enabled asset in turn:
//!
//! - [`resolver`]: target-map entry → `AssetConfig`
//! - [`scheduler`] / [`guard`]: is it time, and has it already happened today
//! - [`executor`]: market buy, settle, fill reconciliation
//! - [`fx`]: quote → USD annotation
//! - [`notify`]: human-facing notifications
//! - [`persister`]: day-stamp write-back with bounded retries
//!
//! [`history`] reads past buys back from the venue for manual checks.
//!
//! Every external dependency sits behind a trait (`ExchangeGateway`,
//! `TargetStore`, `Notifier`, `RateSource`, `Clock`) so the whole cycle runs
//! in tests without a network.

pub mod cycle;
pub mod executor;
pub mod fx;
pub mod guard;
pub mod history;
pub mod notify;
pub mod persister;
pub mod resolver;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod test_support;

pub use cycle::{AssetOutcome, CycleReport, CycleSettings, DcaCycle};
