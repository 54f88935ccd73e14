//! # Meridian Engine
//!
//! The central orchestrator. The engine wires the market cache, the regime
//! detector and strategy selector, the signal generators, the risk gate, and
//! the execution manager into the signal-risk-execution loop:
//!
//! 1. snapshots stream in and replace the cached market state wholesale;
//! 2. each symbol's worker re-classifies the regime and, when it has been
//!    stable long enough, swaps its generator;
//! 3. the active generator evaluates the fresh snapshot;
//! 4. intents that clear the confidence threshold go to the risk gate;
//! 5. approvals go to the execution manager as paired legs.
//!
//! Each symbol runs its own task; the ledger and risk gate are the shared,
//! lock-guarded state between them. Shutdown is cooperative through a watch
//! channel.

pub mod error;
pub mod worker;

pub use error::EngineError;
pub use worker::SymbolWorker;

use chrono::{Duration as ChronoDuration, Utc};
use configuration::Config;
use core_types::MarketSnapshot;
use events::EngineEvent;
use executor::{ExchangeGateway, ExecutionManager, Ledger};
use market_data::SnapshotStore;
use metrics::SharedMetrics;
use risk::RiskGate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Mutex};

/// Capacity for the per-symbol data-notification channels. Snapshots are
/// latest-wins data; a small buffer with drop-on-full keeps slow symbols from
/// backing up the feed.
const NOTIFY_CHANNEL_CAPACITY: usize = 64;

/// The live trading engine.
pub struct Engine {
    config: Config,
    store: Arc<SnapshotStore>,
    ledger: Arc<Mutex<Ledger>>,
    gate: Arc<Mutex<RiskGate>>,
    manager: Arc<ExecutionManager>,
    events: broadcast::Sender<EngineEvent>,
    metrics: SharedMetrics,
}

impl Engine {
    pub fn new(
        config: Config,
        gateway: Arc<dyn ExchangeGateway>,
        metrics: SharedMetrics,
    ) -> Result<Self, EngineError> {
        let store = Arc::new(SnapshotStore::new());
        let ledger = Arc::new(Mutex::new(Ledger::new(
            config.trading.initial_capital,
            ChronoDuration::seconds(config.trading.equity_mark_interval_secs as i64),
        )));
        let gate = Arc::new(Mutex::new(RiskGate::new(
            config.risk.clone(),
            &config.circuit_breaker,
            config.trading.initial_capital,
        )?));
        let (events, _) = broadcast::channel(1024);
        let manager = Arc::new(ExecutionManager::new(
            gateway,
            Arc::clone(&ledger),
            Arc::clone(&gate),
            events.clone(),
            Arc::clone(&metrics),
            config.trading.slippage_tolerance,
            Duration::from_millis(config.trading.order_timeout_ms),
        ));

        Ok(Self {
            config,
            store,
            ledger,
            gate,
            manager,
            events,
            metrics,
        })
    }

    /// Subscribes to the engine's event stream. Slow subscribers lag and lose
    /// events; the trading path never waits for them.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn ledger(&self) -> Arc<Mutex<Ledger>> {
        Arc::clone(&self.ledger)
    }

    /// Runs the engine until the feed ends or shutdown is signalled.
    pub async fn run(
        &self,
        mut feed: mpsc::Receiver<MarketSnapshot>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), EngineError> {
        // One worker task and one data-notification channel per configured
        // symbol; workers read the actual snapshots from the store.
        let mut routes: HashMap<String, mpsc::Sender<()>> = HashMap::new();
        let mut handles = Vec::new();

        // Internal stop signal for tasks that outlive the feed (the
        // mark-to-market ticker), so `run` can still return when the feed
        // ends without an external shutdown.
        let (halt_tx, halt_rx) = watch::channel(false);

        for symbol in &self.config.trading.symbols {
            let (tx, rx) = mpsc::channel(NOTIFY_CHANNEL_CAPACITY);
            routes.insert(symbol.clone(), tx);

            let mut worker = SymbolWorker::new(
                symbol.clone(),
                &self.config,
                Arc::clone(&self.store),
                Arc::clone(&self.ledger),
                Arc::clone(&self.gate),
                Arc::clone(&self.manager),
                self.events.clone(),
                Arc::clone(&self.metrics),
            )?;
            let mut worker_shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                worker.run(rx, &mut worker_shutdown).await;
            }));
        }

        // Mark-to-market loop: refresh unrealized PnL and extend the equity
        // curve on a cadence independent of fills.
        {
            let store = Arc::clone(&self.store);
            let ledger = Arc::clone(&self.ledger);
            let events = self.events.clone();
            let interval = Duration::from_secs(self.config.trading.equity_mark_interval_secs.max(1));
            let mut mark_shutdown = shutdown.clone();
            let mut mark_halt = halt_rx;
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        biased;
                        _ = mark_shutdown.changed() => {
                            if *mark_shutdown.borrow() {
                                break;
                            }
                        }
                        _ = mark_halt.changed() => {
                            if *mark_halt.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            let prices = store.mid_prices().await;
                            let now = Utc::now();
                            let mut ledger = ledger.lock().await;
                            ledger.mark_to_market(&prices, now);
                            let state = ledger.portfolio_state(&prices, now);
                            drop(ledger);
                            let _ = events.send(EngineEvent::PortfolioState(state));
                        }
                    }
                }
            }));
        }

        tracing::info!(
            symbols = self.config.trading.symbols.len(),
            "engine running, waiting for market data"
        );

        let mut feed_shutdown = shutdown.clone();
        loop {
            tokio::select! {
                biased;
                _ = feed_shutdown.changed() => {
                    if *feed_shutdown.borrow() {
                        tracing::info!("shutdown requested, stopping feed routing");
                        break;
                    }
                }
                snapshot = feed.recv() => {
                    let Some(snapshot) = snapshot else {
                        tracing::warn!("market feed ended");
                        break;
                    };
                    self.route(snapshot, &routes).await;
                }
            }
        }

        let _ = halt_tx.send(true); // Stops the mark-to-market ticker.
        drop(routes); // Closes worker channels so they drain and exit.
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }

    async fn route(&self, snapshot: MarketSnapshot, routes: &HashMap<String, mpsc::Sender<()>>) {
        let Some(tx) = routes.get(&snapshot.symbol) else {
            tracing::debug!(symbol = %snapshot.symbol, "snapshot for unconfigured symbol dropped");
            return;
        };
        self.store.update(snapshot).await;
        // Latest-wins: a full channel means the worker is behind; it will
        // pick the freshest snapshot up from the store on its next wake-up.
        if tx.try_send(()).is_err() {
            self.metrics.record_counter("snapshots_dropped_total", 1, &[]);
        }
    }
}
