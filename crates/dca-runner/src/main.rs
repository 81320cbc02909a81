//! # dca-runner
//!
//! Entry point for the scheduled DCA buyer.
//!
//! Each invocation runs one cycle and exits; an external scheduler (cron,
//! CI workflow) invokes it periodically. Running it more than once per
//! scheduled slot is safe.
//!
//! # Usage
//!
//! ```bash
//! dca-runner --config dca.json run
//! dca-runner status
//! dca-runner balances --log-level warn
//! dca-runner history BTC_THB --limit 5
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dca_core::config::AppConfig;
use dca_core::logging::LogFormat;
use dca_core::time_util::{Clock, SystemClock};
use dca_engine::cycle::{self, AssetOutcome, CycleSettings, DcaCycle};
use dca_engine::fx::RateProvider;
use dca_engine::persister::RetryPolicy;
use dca_engine::store::TargetStore;
use dca_engine::{history, notify, store};
use dca_td::ExchangeGateway;
use tracing::{error, info, warn};

/// Scheduled, idempotent DCA market buys.
#[derive(Parser)]
#[command(name = "dca-runner", about = "Scheduled idempotent DCA market buys")]
struct Cli {
    /// Configuration file path (JSON). Environment variables are applied on top.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Run one scheduling cycle (default).
    Run,
    /// Show each asset's resolved schedule and guard state.
    Status,
    /// Show non-zero exchange balances.
    Balances,
    /// Show recent buys for one asset.
    History {
        /// Target-map key or symbol (e.g. BTC_THB, BTC/USDT).
        asset: String,
        /// Maximum number of orders to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Pretty };
    dca_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), format, "dca-runner");

    let config = dca_core::config::load_config(cli.config.as_deref())?;
    info!(
        "dca-runner starting: exchange={}, store={:?}, timezone={}",
        config.exchange.exchange, config.store.kind, config.schedule.timezone
    );

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Status => status(&config).await,
        Command::Balances => balances(&config).await,
        Command::History { asset, limit } => order_history(&config, &asset, limit).await,
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    let tz = config.timezone()?;
    let notifier: Arc<dyn notify::Notifier> = Arc::from(notify::from_config(&config.notify, tz)?);
    let settings = CycleSettings {
        defaults: config.defaults()?,
        settle_delay: config.settle_delay(),
        retry: RetryPolicy::from_config(&config.persist),
        title: config.notify.title.clone(),
    };

    let cycle = DcaCycle::new(
        Arc::from(store::create_store(&config.store)?),
        Arc::from(dca_td::registry::create_gateway(&config.exchange)?),
        Arc::new(RateProvider::from_config(&config.fx)?),
        notifier,
        Arc::new(SystemClock::new(tz)),
        settings,
    );

    let report = cycle.run().await?;
    for outcome in &report.outcomes {
        match outcome {
            AssetOutcome::Skipped { key, reason } => info!("{key}: skipped ({reason:?})"),
            AssetOutcome::Invalid { key, error } => error!("{key}: entry not usable: {error}"),
            AssetOutcome::Bought { key, record, attempts } => {
                info!("{key}: bought order {} (stamp saved in {attempts} attempt(s))", record.order_id)
            }
            AssetOutcome::Unconfirmed { key, record } => warn!("{key}: order {} unconfirmed", record.order_id),
            AssetOutcome::Failed { key, error } => error!("{key}: failed: {error}"),
            AssetOutcome::PersistFailed { key, error, .. } => error!("{key}: bought but not stamped: {error}"),
        }
    }

    if report.has_fatal() {
        bail!("LAST_BUY_DATE could not be saved for at least one purchase; manual action required");
    }
    Ok(())
}

async fn status(config: &AppConfig) -> Result<()> {
    let tz = config.timezone()?;
    let store = store::create_store(&config.store)?;
    let map = match store.get().await {
        Ok(map) => map,
        Err(store::StoreError::NotFound) => dca_core::TargetMap::new(),
        Err(e) => return Err(e.into()),
    };
    let now = SystemClock::new(tz).now();

    println!("now: {}", now.format("%Y-%m-%d %H:%M:%S %Z"));
    for planned in cycle::plan(&map, &config.defaults()?, &now) {
        let (asset, auth) = match planned {
            Ok(planned) => planned,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        let last = asset
            .last_buy_date
            .map(|d| d.format(dca_core::DATE_FORMAT).to_string())
            .unwrap_or_else(|| "never".into());
        println!(
            "{:<12} time={} amount={:.2} THB last_buy={} -> {:?}",
            asset.asset_key, asset.schedule, asset.amount_quote, last, auth
        );
    }
    Ok(())
}

async fn balances(config: &AppConfig) -> Result<()> {
    let gateway = dca_td::registry::create_gateway(&config.exchange)?;
    let balances = gateway.balances().await?;
    for (currency, balance) in balances.iter().filter(|(_, b)| b.total() > 0.0) {
        println!(
            "{currency:<8} available={:.8} reserved={:.8}",
            balance.available, balance.reserved
        );
    }
    Ok(())
}

async fn order_history(config: &AppConfig, asset: &str, limit: usize) -> Result<()> {
    let tz = config.timezone()?;
    let gateway = dca_td::registry::create_gateway(&config.exchange)?;
    let buys = history::recent_buys(gateway.as_ref(), asset, limit).await?;
    if buys.is_empty() {
        println!("no buys found for {asset}");
    }
    for order in &buys {
        println!("{}", history::format_row(order, tz));
    }
    Ok(())
}
