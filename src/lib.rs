pub mod cli;
pub mod core;
pub mod lookup;
pub mod providers;
pub mod store;
pub mod sync;

use crate::core::calendar::business_day;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AppConfig;
use crate::core::{CurrencyPair, RateFetcher};
use crate::lookup::RateLookup;
use crate::providers::NbpRateFetcher;
use crate::store::{FjallHistoryStore, HistoryStore, MemoryLockStore};
use crate::sync::{BatchRefresh, RefreshCoordinator, RefreshWorker};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Currencies,
    Quote { base: String, quote: String },
    Sync,
    History { pair: String },
}

struct AppContext {
    config: AppConfig,
    fetcher: Arc<dyn RateFetcher>,
    store: Arc<dyn HistoryStore>,
    clock: Arc<dyn Clock>,
}

impl AppContext {
    fn build(config: AppConfig) -> Result<Self> {
        let fetcher = NbpRateFetcher::new(config.nbp_base_url())?
            .with_anchor(config.sync.anchor_currency.clone())
            .with_retry_policy(config.sync.retries, config.sync.retry_delay_ms);

        let store_path = config.default_data_path()?.join("history");
        std::fs::create_dir_all(&store_path)
            .with_context(|| format!("Failed to create directory: {}", store_path.display()))?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = FjallHistoryStore::open(&store_path)
            .with_context(|| {
                format!("Failed to open history store at {}", store_path.display())
            })?
            .with_clock(clock.clone());
        debug!("History store at {}", store_path.display());

        Ok(Self {
            config,
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
            clock,
        })
    }

    fn batch_refresh(&self) -> BatchRefresh {
        BatchRefresh::new(self.fetcher.clone(), self.store.clone(), self.clock.clone())
            .with_window_days(self.config.sync.window_days)
            .with_policy(self.config.sync.on_failure)
            .with_pairs(self.config.sync.pairs.clone())
    }
}

pub async fn run_command(cmd: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxsync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = AppContext::build(config)?;

    match cmd {
        AppCommand::Currencies => {
            cli::currencies::run(app.fetcher.as_ref(), app.clock.today()).await
        }
        AppCommand::Quote { base, quote } => run_quote(&app, &base, &quote).await,
        AppCommand::Sync => cli::sync::run(&app.batch_refresh()).await.map(|_| ()),
        AppCommand::History { pair } => {
            let pair: CurrencyPair = pair.parse()?;
            cli::history::run(app.store.as_ref(), &pair).await
        }
    }
}

/// Prints the current cross rate, then waits for the history refresh it
/// scheduled before the process exits.
async fn run_quote(app: &AppContext, base: &str, quote: &str) -> Result<()> {
    let date = business_day(app.clock.today());
    let table = app
        .fetcher
        .fetch_table(date)
        .await
        .with_context(|| format!("Failed to fetch rate table for {date}"))?;

    let locks = Arc::new(MemoryLockStore::new(app.clock.clone()));
    let (coordinator, jobs) =
        RefreshCoordinator::new(locks, app.clock.clone(), app.config.sync.lock_ttl());
    let worker = RefreshWorker::new(app.batch_refresh()).spawn(jobs);

    let lookup = RateLookup::new(table, app.store.clone(), coordinator, app.clock.clone());
    let result = lookup.lookup(base, quote).await;
    // Closes the queue so the worker exits after the scheduled job.
    drop(lookup);

    let pair_quote = result?;
    cli::quote::display(&pair_quote);

    let pb = cli::ui::new_spinner(&format!("Refreshing history for {}", pair_quote.pair));
    let processed = worker.await.context("Refresh worker panicked")?;
    pb.finish_and_clear();
    debug!(processed, "Refresh worker finished");
    Ok(())
}
