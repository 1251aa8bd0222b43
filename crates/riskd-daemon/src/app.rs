//! Component wiring and the intake loop.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use riskd_core::{AccountId, RiskEvent};
use riskd_enforce::{Enforcer, LoggingSink};
use riskd_lockout::{LockoutManager, TimerManager};
use riskd_persistence::StateStore;
use riskd_pnl::PnlTracker;
use riskd_router::{EventRouter, Pipeline};
use riskd_rules::RuleEngine;
use riskd_schedule::ResetScheduler;
use riskd_state::StateManager;
use riskd_trackers::{ContractCache, QuoteTracker, TradeCounter, DEFAULT_MAX_WINDOW_SECS};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::source::StaticMetadataSource;

/// The wired daemon.
pub struct Application {
    config: AppConfig,
    scheduler: Arc<ResetScheduler>,
    router: EventRouter,
}

impl Application {
    /// Validate configuration and wire the component graph.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let store = Arc::new(StateStore::open(config.data_dir.clone())?);
        let state = Arc::new(StateManager::new());
        let quotes = Arc::new(QuoteTracker::new(ChronoDuration::milliseconds(
            config.market_data.quote_stale_after_ms as i64,
        )));
        let metadata_source = Arc::new(StaticMetadataSource::from_config(
            &config.contracts,
            &config.market_data,
        ));
        let contracts = Arc::new(ContractCache::new(
            metadata_source,
            std::time::Duration::from_millis(config.market_data.metadata_fetch_timeout_ms),
        ));
        // Retention must cover the configured frequency window, or the
        // counter silently undercounts long windows.
        let trades = Arc::new(TradeCounter::new(ChronoDuration::seconds(
            (config.rules.trade_frequency.window_secs as i64).max(DEFAULT_MAX_WINDOW_SECS),
        )));
        let pnl = Arc::new(PnlTracker::new(
            state.clone(),
            quotes.clone(),
            contracts.clone(),
            store.clone(),
        )?);
        let timers = Arc::new(TimerManager::new());
        let lockouts = Arc::new(LockoutManager::new(store.clone())?.with_timers(timers));

        let enforcer = Arc::new(
            Enforcer::new(Arc::new(LoggingSink), lockouts.clone())
                .with_retry(config.enforcement.retry_policy())
                .with_call_timeout(config.enforcement.call_timeout()),
        );
        let engine = Arc::new(RuleEngine::from_config(&config.rules));
        let calendar = config.reset.calendar()?;

        // Boundary callbacks, in the order they must run.
        let mut scheduler = ResetScheduler::new(calendar.clone(), store)?;
        scheduler.register_callback("pnl-daily-reset", {
            let pnl = pnl.clone();
            Arc::new(move |account, date| pnl.reset_daily(account, date))
        });
        scheduler.register_callback("trade-counter-reset", {
            let trades = trades.clone();
            Arc::new(move |account, _| trades.reset(account))
        });
        scheduler.register_callback("lockout-review", {
            let lockouts = lockouts.clone();
            Arc::new(move |_, _| lockouts.review())
        });
        let scheduler = Arc::new(scheduler);

        let now = Utc::now();
        for account in &config.accounts {
            scheduler.register_account(&AccountId::from(account.as_str()), now);
        }

        let pipeline = Arc::new(Pipeline {
            state,
            quotes,
            trades,
            contracts,
            pnl,
            lockouts,
            engine,
            enforcer,
            calendar,
            trade_window: ChronoDuration::seconds(config.rules.trade_frequency.window_secs as i64),
        });
        let router = EventRouter::start(config.router.router_config(), pipeline);

        Ok(Self {
            config,
            scheduler,
            router,
        })
    }

    /// Queue one event, registering unseen accounts for daily resets.
    pub async fn ingest(&self, event: RiskEvent) -> AppResult<()> {
        if let Some(account_id) = event.account_id() {
            self.scheduler.register_account(account_id, Utc::now());
        }
        self.router.submit(event).await?;
        Ok(())
    }

    /// Catch up missed resets, then drain the event source until it
    /// ends or ctrl-c arrives; queued events are drained before return.
    pub async fn run(self) -> AppResult<()> {
        self.scheduler.catch_up(Utc::now());
        let scheduler_task = tokio::spawn(self.scheduler.clone().run());

        let result = tokio::select! {
            result = self.drain_source() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                Ok(())
            }
        };

        scheduler_task.abort();
        self.router.shutdown().await;
        result
    }

    async fn drain_source(&self) -> AppResult<()> {
        match &self.config.source.events_file {
            Some(path) => {
                info!(path = %path.display(), "replaying events from file");
                let file = tokio::fs::File::open(path).await?;
                self.replay(BufReader::new(file)).await
            }
            None => {
                info!("reading events from stdin");
                self.replay(BufReader::new(tokio::io::stdin())).await
            }
        }
    }

    /// Consume JSONL events; a malformed line is logged and skipped.
    async fn replay<R: AsyncBufRead + Unpin>(&self, reader: R) -> AppResult<()> {
        let mut lines = reader.lines();
        let mut count = 0u64;
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RiskEvent>(line) {
                Ok(event) => {
                    self.ingest(event).await?;
                    count += 1;
                }
                Err(e) => warn!(error = %e, "skipping malformed event line"),
            }
        }
        info!(count, "event source drained");
        Ok(())
    }
}
