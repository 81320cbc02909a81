//! Gateway registry: factory for creating an [`ExchangeGateway`] from config.

use anyhow::{Result, anyhow};
use dca_core::config::ExchangeConfig;

use crate::ExchangeGateway;
use crate::bitkub::BitkubTd;

/// Create a gateway based on the `exchange` field in the config.
pub fn create_gateway(config: &ExchangeConfig) -> Result<Box<dyn ExchangeGateway>> {
    let exchange = config.exchange.to_lowercase();

    match exchange.as_str() {
        "bitkub" => Ok(Box::new(BitkubTd::new(config)?)),
        other => Err(anyhow!("Unknown exchange: {other}")),
    }
}
