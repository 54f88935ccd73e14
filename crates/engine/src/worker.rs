use crate::error::EngineError;
use chrono::{Duration as ChronoDuration, Utc};
use configuration::{Config, Strategies, TradingSettings};
use core_types::{MarketSnapshot, RiskDecision};
use events::{EngineEvent, RegimeChange, RiskEvent};
use executor::{ExecutionManager, Ledger};
use market_data::SnapshotStore;
use metrics::SharedMetrics;
use regime::{RegimeDetector, SelectorDecision, StrategySelector};
use risk::RiskGate;
use std::sync::Arc;
use strategies::{create_strategy, Strategy};
use tokio::sync::{broadcast, mpsc, watch, Mutex};

/// The per-symbol trading loop: regime detection, strategy selection, signal
/// evaluation, risk gating, and hand-off to the execution manager.
///
/// The worker owns its generator exclusively, so a strategy swap can never
/// interrupt an evaluation in flight; the swap simply takes effect on the
/// next snapshot.
pub struct SymbolWorker {
    symbol: String,
    detector: RegimeDetector,
    selector: StrategySelector,
    strategy: Box<dyn Strategy>,
    strategy_params: Strategies,
    trading: TradingSettings,
    staleness: ChronoDuration,
    store: Arc<SnapshotStore>,
    ledger: Arc<Mutex<Ledger>>,
    gate: Arc<Mutex<RiskGate>>,
    manager: Arc<ExecutionManager>,
    events: broadcast::Sender<EngineEvent>,
    metrics: SharedMetrics,
}

impl SymbolWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: String,
        config: &Config,
        store: Arc<SnapshotStore>,
        ledger: Arc<Mutex<Ledger>>,
        gate: Arc<Mutex<RiskGate>>,
        manager: Arc<ExecutionManager>,
        events: broadcast::Sender<EngineEvent>,
        metrics: SharedMetrics,
    ) -> Result<Self, EngineError> {
        let detector = RegimeDetector::new(&config.regime)?;
        let selector = StrategySelector::new(config.regime.clone());
        let strategy = create_strategy(
            selector.active_strategy(),
            &config.strategies,
            &config.trading,
        )?;

        Ok(Self {
            symbol,
            detector,
            selector,
            strategy,
            strategy_params: config.strategies.clone(),
            trading: config.trading.clone(),
            staleness: ChronoDuration::milliseconds(config.trading.snapshot_staleness_ms),
            store,
            ledger,
            gate,
            manager,
            events,
            metrics,
        })
    }

    /// Evaluates on every data notification until the channel closes or
    /// shutdown fires. Each wake-up pulls the freshest cached snapshot, so a
    /// worker that fell behind never chews through a backlog of stale books.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<()>, shutdown: &mut watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(symbol = %self.symbol, "worker shutting down");
                        return;
                    }
                }
                tick = rx.recv() => {
                    if tick.is_none() {
                        tracing::debug!(symbol = %self.symbol, "data channel closed");
                        return;
                    }
                    let Some(snapshot) = self.store.latest(&self.symbol).await else {
                        continue;
                    };
                    if let Err(e) = self.process_snapshot(&snapshot).await {
                        // One bad cycle must not kill the symbol loop.
                        tracing::error!(symbol = %self.symbol, error = %e, "evaluation cycle failed");
                    }
                }
            }
        }
    }

    /// Runs one full signal-risk-execution cycle on a snapshot.
    pub async fn process_snapshot(&mut self, snapshot: &MarketSnapshot) -> Result<(), EngineError> {
        let now = Utc::now();
        if self.store.is_stale(&self.symbol, now, self.staleness).await {
            tracing::debug!(symbol = %self.symbol, "market state is stale, standing aside");
            self.metrics.record_counter("stale_snapshots_total", 1, &[]);
            return Ok(());
        }
        let Some(mid) = snapshot.mid_price() else {
            return Ok(());
        };

        // Regime first: the reading may swap which generator sees this cycle's
        // successor snapshots.
        let reading = self.detector.observe(mid);
        if let SelectorDecision::Swap { from, to, strategy } = self.selector.on_reading(reading) {
            self.strategy = create_strategy(strategy, &self.strategy_params, &self.trading)?;
            let _ = self.events.send(EngineEvent::RegimeChange(RegimeChange {
                timestamp: now,
                symbol: self.symbol.clone(),
                from,
                to,
                confidence: reading.confidence,
                strategy,
            }));
            self.metrics.record_counter("strategy_swaps_total", 1, &[]);
        }

        let Some(intent) = self.strategy.evaluate(snapshot)? else {
            return Ok(());
        };
        self.metrics.record_counter("signals_total", 1, &[]);

        if intent.confidence < self.trading.confidence_threshold {
            tracing::debug!(
                symbol = %self.symbol,
                confidence = %intent.confidence,
                threshold = %self.trading.confidence_threshold,
                "signal below confidence threshold"
            );
            self.metrics.record_counter("signals_below_confidence_total", 1, &[]);
            return Ok(());
        }

        let prices = self.store.mid_prices().await;
        let portfolio = self.ledger.lock().await.portfolio_state(&prices, now);
        let decision = self.gate.lock().await.evaluate(&intent, &portfolio, now);

        match decision {
            RiskDecision::Approved(approval) => {
                self.metrics.record_counter("approvals_total", 1, &[]);
                self.manager.execute_approval(approval, snapshot).await?;
            }
            RiskDecision::Rejected(reason) => {
                tracing::info!(symbol = %self.symbol, code = reason.code(), "intent rejected");
                self.metrics
                    .record_counter("risk_rejections_total", 1, &[("reason", reason.code())]);
                let _ = self.events.send(EngineEvent::Risk(RiskEvent {
                    timestamp: now,
                    symbol: self.symbol.clone(),
                    reason,
                    detail: format!("intent {} rejected", intent.intent_id),
                }));
            }
        }
        Ok(())
    }
}
