use crate::error::ExecutorError;
use crate::gateway::{ExchangeGateway, OrderResult};
use crate::ledger::Ledger;
use chrono::Utc;
use core_types::{
    Approval, Fill, LegStatus, MarketSnapshot, OrderKind, OrderLeg, OrderSide, RejectReason,
};
use events::{EngineEvent, OrderOutcome, RiskEvent};
use metrics::SharedMetrics;
use risk::RiskGate;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Turns risk approvals into paired order legs and keeps the ledger honest
/// through their partial failures.
///
/// A pair is the entry leg at the approved price and the exit leg at the
/// take-profit price. Both are submitted concurrently and joined under the
/// configured timeout. The recovery matrix:
///
/// - both legs fill: the round trip is booked as intended;
/// - one leg fills, the other fails: the pending partner is canceled and the
///   filled leg is flattened at market, with a `leg_failure` risk event;
/// - the deadline passes: both legs are canceled best-effort and the pair is
///   treated as failed.
///
/// Every failure, including gateway connectivity errors, feeds the risk
/// gate's circuit breaker. Every fill is applied to the ledger exactly once.
pub struct ExecutionManager {
    gateway: Arc<dyn ExchangeGateway>,
    ledger: Arc<Mutex<Ledger>>,
    gate: Arc<Mutex<RiskGate>>,
    events: broadcast::Sender<EngineEvent>,
    metrics: SharedMetrics,
    slippage_tolerance: Decimal,
    order_timeout: Duration,
}

/// How one leg of the pair ended up.
enum LegOutcome {
    Filled(Fill),
    Failed(LegStatus),
}

impl ExecutionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        ledger: Arc<Mutex<Ledger>>,
        gate: Arc<Mutex<RiskGate>>,
        events: broadcast::Sender<EngineEvent>,
        metrics: SharedMetrics,
        slippage_tolerance: Decimal,
        order_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            ledger,
            gate,
            events,
            metrics,
            slippage_tolerance,
            order_timeout,
        }
    }

    /// Executes one approval as an entry/take-profit pair.
    ///
    /// Pre-submission guards (stale approval, slippage) drop the approval
    /// with a risk event rather than an error; only ledger invariant
    /// violations propagate as `Err`.
    pub async fn execute_approval(
        &self,
        approval: Approval,
        snapshot: &MarketSnapshot,
    ) -> Result<(), ExecutorError> {
        let now = Utc::now();

        // One-shot token: too old means the market has moved on.
        if approval.is_stale(now) {
            self.emit_risk(&approval.symbol, RejectReason::StaleApproval, "approval expired before submission");
            return Ok(());
        }

        // Slippage pre-check against the side we would actually trade.
        let market_price = match approval.side {
            OrderSide::Buy => snapshot.best_ask().map(|l| l.price),
            OrderSide::Sell => snapshot.best_bid().map(|l| l.price),
        }
        .or_else(|| snapshot.mid_price());
        let Some(market_price) = market_price else {
            self.emit_risk(&approval.symbol, RejectReason::SlippageAbort, "no market price available");
            return Ok(());
        };
        let drift = (market_price - approval.price).abs() / approval.price;
        if drift > self.slippage_tolerance {
            self.emit_risk(
                &approval.symbol,
                RejectReason::SlippageAbort,
                &format!("price drifted {drift} beyond tolerance"),
            );
            self.metrics.record_counter("slippage_aborts_total", 1, &[]);
            return Ok(());
        }

        let entry = OrderLeg {
            client_order_id: Uuid::new_v4(),
            symbol: approval.symbol.clone(),
            side: approval.side,
            kind: OrderKind::Limit,
            price: approval.price,
            quantity: approval.quantity,
            status: LegStatus::Pending,
        };
        let exit = OrderLeg {
            client_order_id: Uuid::new_v4(),
            symbol: approval.symbol.clone(),
            side: approval.side.opposite(),
            kind: OrderKind::Limit,
            price: approval.take_profit_price,
            quantity: approval.quantity,
            status: LegStatus::Pending,
        };

        {
            let mut ledger = self.ledger.lock().await;
            ledger.register_order(entry.client_order_id);
            ledger.register_order(exit.client_order_id);
        }

        let submitted_at = std::time::Instant::now();
        let pair = futures::future::join(
            self.gateway.submit_order(&entry),
            self.gateway.submit_order(&exit),
        );

        let (entry_outcome, exit_outcome) =
            match tokio::time::timeout(self.order_timeout, pair).await {
                Ok((entry_result, exit_result)) => (
                    self.classify(&entry, entry_result).await?,
                    self.classify(&exit, exit_result).await?,
                ),
                Err(_) => {
                    tracing::warn!(
                        symbol = %approval.symbol,
                        timeout_ms = self.order_timeout.as_millis() as u64,
                        "order pair timed out, canceling both legs"
                    );
                    for leg in [&entry, &exit] {
                        if let Err(e) = self
                            .gateway
                            .cancel_order(&leg.symbol, leg.client_order_id)
                            .await
                        {
                            tracing::warn!(error = %e, "cancel after timeout failed");
                        }
                        self.emit_outcome(leg, LegStatus::Expired);
                    }
                    self.gate.lock().await.record_order_failure(Utc::now());
                    self.metrics.record_counter("order_timeouts_total", 1, &[]);
                    return Ok(());
                }
            };

        self.metrics.observe_histogram(
            "pair_submit_latency_ms",
            submitted_at.elapsed().as_secs_f64() * 1000.0,
            &[],
        );

        match (entry_outcome, exit_outcome) {
            (LegOutcome::Filled(entry_fill), LegOutcome::Filled(exit_fill)) => {
                // Protections go on as soon as the entry opens the position,
                // before the exit settles it.
                self.apply_fill(&entry_fill).await?;
                self.protect(&approval).await;
                self.apply_fill(&exit_fill).await?;
                self.gate.lock().await.record_order_success();
                self.metrics.record_counter("pairs_filled_total", 1, &[]);
            }
            (LegOutcome::Filled(fill), LegOutcome::Failed(_))
            | (LegOutcome::Failed(_), LegOutcome::Filled(fill)) => {
                self.apply_fill(&fill).await?;
                if fill.side == approval.side {
                    // The entry filled alone. Protect it now: if the flatten
                    // below cannot get out, the position stays open and must
                    // carry its stop and target.
                    self.protect(&approval).await;
                }
                self.flatten(&fill).await?;
                self.emit_risk(
                    &approval.symbol,
                    RejectReason::LegFailure,
                    "partner leg failed, filled leg flattened",
                );
                self.gate.lock().await.record_order_failure(Utc::now());
                self.metrics.record_counter("leg_failures_total", 1, &[]);
            }
            (LegOutcome::Failed(_), LegOutcome::Failed(_)) => {
                self.gate.lock().await.record_order_failure(Utc::now());
                self.metrics.record_counter("pairs_failed_total", 1, &[]);
            }
        }

        Ok(())
    }

    /// Normalizes a gateway response into a leg outcome, emitting the
    /// terminal order event and canceling legs the venue left dangling.
    ///
    /// A failed leg may still carry a partial execution; that quantity is
    /// booked into the ledger here so cash and position never drift from
    /// the venue.
    async fn classify(
        &self,
        leg: &OrderLeg,
        result: Result<OrderResult, crate::error::GatewayError>,
    ) -> Result<LegOutcome, ExecutorError> {
        match result {
            Ok(OrderResult {
                status: LegStatus::Filled,
                fill: Some(fill),
                ..
            }) => {
                self.emit_outcome(leg, LegStatus::Filled);
                Ok(LegOutcome::Filled(fill))
            }
            Ok(result) => {
                if let Some(partial) = &result.fill {
                    tracing::warn!(
                        symbol = %leg.symbol,
                        status = ?result.status,
                        executed = %partial.quantity,
                        "leg failed after a partial execution, booking it"
                    );
                    self.apply_fill(partial).await?;
                }
                // A leg the venue reports as still active has to be canceled
                // before we account the pair as failed.
                if result.status.is_active() {
                    if let Err(e) = self
                        .gateway
                        .cancel_order(&leg.symbol, leg.client_order_id)
                        .await
                    {
                        tracing::warn!(error = %e, "failed to cancel dangling leg");
                    }
                    self.emit_outcome(leg, LegStatus::Canceled);
                    return Ok(LegOutcome::Failed(LegStatus::Canceled));
                }
                self.emit_outcome(leg, result.status);
                Ok(LegOutcome::Failed(result.status))
            }
            Err(e) => {
                if e.is_connectivity() {
                    tracing::error!(error = %e, symbol = %leg.symbol, "gateway connectivity failure");
                } else {
                    tracing::warn!(error = %e, symbol = %leg.symbol, "order submission failed");
                }
                self.emit_outcome(leg, LegStatus::Rejected);
                Ok(LegOutcome::Failed(LegStatus::Rejected))
            }
        }
    }

    /// Attaches the approval's stop and target to the open position.
    async fn protect(&self, approval: &Approval) {
        self.ledger.lock().await.set_protections(
            &approval.symbol,
            approval.stop_loss_price,
            approval.take_profit_price,
        );
    }

    /// Closes out a filled leg at market after its partner failed.
    async fn flatten(&self, filled: &Fill) -> Result<(), ExecutorError> {
        let leg = OrderLeg {
            client_order_id: Uuid::new_v4(),
            symbol: filled.symbol.clone(),
            side: filled.side.opposite(),
            kind: OrderKind::Market,
            // Market order: the price is advisory for the gateway.
            price: filled.price,
            quantity: filled.quantity,
            status: LegStatus::Pending,
        };
        self.ledger.lock().await.register_order(leg.client_order_id);

        match tokio::time::timeout(self.order_timeout, self.gateway.submit_order(&leg)).await {
            Ok(Ok(OrderResult {
                fill: Some(fill), ..
            })) => {
                self.emit_outcome(&leg, LegStatus::Filled);
                self.apply_fill(&fill).await?;
                Ok(())
            }
            Ok(Ok(result)) => {
                tracing::error!(
                    symbol = %leg.symbol,
                    status = ?result.status,
                    "flatten order did not fill, position remains open"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, symbol = %leg.symbol, "flatten order failed");
                Ok(())
            }
            Err(_) => {
                tracing::error!(symbol = %leg.symbol, "flatten order timed out");
                Ok(())
            }
        }
    }

    async fn apply_fill(&self, fill: &Fill) -> Result<(), ExecutorError> {
        let applied = self.ledger.lock().await.apply_fill(fill)?;
        if applied {
            let _ = self.events.send(EngineEvent::FillApplied(fill.clone()));
            self.metrics.record_counter("fills_total", 1, &[]);
        }
        Ok(())
    }

    fn emit_risk(&self, symbol: &str, reason: RejectReason, detail: &str) {
        tracing::warn!(symbol, code = reason.code(), detail, "execution dropped");
        let _ = self.events.send(EngineEvent::Risk(RiskEvent {
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            reason,
            detail: detail.to_string(),
        }));
    }

    fn emit_outcome(&self, leg: &OrderLeg, status: LegStatus) {
        let _ = self.events.send(EngineEvent::OrderOutcome(OrderOutcome {
            timestamp: Utc::now(),
            client_order_id: leg.client_order_id,
            symbol: leg.symbol.clone(),
            status,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use configuration::{CircuitBreakerSettings, RiskSettings};
    use core_types::BookLevel;
    use metrics::NoopSink;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// A gateway whose behavior per side is scripted by the test.
    #[derive(Default)]
    struct ScriptedGateway {
        /// Outcomes to hand out, keyed by order side, popped front first.
        script: StdMutex<HashMap<OrderSide, VecDeque<Script>>>,
        canceled: StdMutex<Vec<Uuid>>,
    }

    enum Script {
        Fill,
        FillAt(Decimal),
        Reject,
        Connectivity,
        Hang,
        /// The leg expires after executing only part of its quantity.
        ExpireWithPartial(Decimal),
    }

    impl ScriptedGateway {
        fn script(self, side: OrderSide, outcomes: Vec<Script>) -> Self {
            self.script
                .lock()
                .unwrap()
                .insert(side, outcomes.into_iter().collect());
            self
        }

        fn canceled_count(&self) -> usize {
            self.canceled.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ExchangeGateway for ScriptedGateway {
        async fn submit_order(&self, leg: &OrderLeg) -> Result<OrderResult, GatewayError> {
            let next = self
                .script
                .lock()
                .unwrap()
                .get_mut(&leg.side)
                .and_then(|q| q.pop_front());
            match next {
                Some(Script::Fill) | None => Ok(OrderResult {
                    client_order_id: leg.client_order_id,
                    status: LegStatus::Filled,
                    fill: Some(Fill {
                        client_order_id: leg.client_order_id,
                        symbol: leg.symbol.clone(),
                        side: leg.side,
                        price: leg.price,
                        quantity: leg.quantity,
                        fee: dec!(0.01),
                        timestamp: Utc::now(),
                    }),
                }),
                Some(Script::FillAt(price)) => Ok(OrderResult {
                    client_order_id: leg.client_order_id,
                    status: LegStatus::Filled,
                    fill: Some(Fill {
                        client_order_id: leg.client_order_id,
                        symbol: leg.symbol.clone(),
                        side: leg.side,
                        price,
                        quantity: leg.quantity,
                        fee: dec!(0.01),
                        timestamp: Utc::now(),
                    }),
                }),
                Some(Script::Reject) => Ok(OrderResult {
                    client_order_id: leg.client_order_id,
                    status: LegStatus::Rejected,
                    fill: None,
                }),
                Some(Script::Connectivity) => {
                    Err(GatewayError::Connectivity("link down".to_string()))
                }
                Some(Script::ExpireWithPartial(quantity)) => Ok(OrderResult {
                    client_order_id: leg.client_order_id,
                    status: LegStatus::Expired,
                    fill: Some(Fill {
                        client_order_id: leg.client_order_id,
                        symbol: leg.symbol.clone(),
                        side: leg.side,
                        price: leg.price,
                        quantity,
                        fee: dec!(0.01),
                        timestamp: Utc::now(),
                    }),
                }),
                Some(Script::Hang) => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn cancel_order(&self, _symbol: &str, client_order_id: Uuid) -> Result<(), GatewayError> {
            self.canceled.lock().unwrap().push(client_order_id);
            Ok(())
        }
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            bids: vec![BookLevel { price: dec!(99.95), size: dec!(5) }],
            asks: vec![BookLevel { price: dec!(100.00), size: dec!(5) }],
            timestamp: Utc::now(),
        }
    }

    fn approval() -> Approval {
        Approval {
            approval_id: Uuid::new_v4(),
            intent_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            price: dec!(100.00),
            quantity: dec!(1),
            stop_loss_price: dec!(98),
            take_profit_price: dec!(104),
            expires_at: Utc::now() + ChronoDuration::seconds(5),
        }
    }

    fn gate() -> Arc<Mutex<RiskGate>> {
        let settings = RiskSettings {
            max_open_positions: 3,
            max_drawdown_pct: dec!(0.1),
            max_risk_per_trade_pct: dec!(0.01),
            stop_loss_pct: dec!(0.02),
            take_profit_pct: dec!(0.04),
            daily_loss_limit_pct: dec!(0.05),
            min_order_notional_usd: dec!(5),
            approval_staleness_ms: 2000,
        };
        let breaker = CircuitBreakerSettings {
            error_threshold: 5,
            cooldown_secs: 300,
        };
        Arc::new(Mutex::new(
            RiskGate::new(settings, &breaker, dec!(10000)).unwrap(),
        ))
    }

    fn manager(
        gateway: Arc<dyn ExchangeGateway>,
        timeout_ms: u64,
    ) -> (
        ExecutionManager,
        Arc<Mutex<Ledger>>,
        broadcast::Receiver<EngineEvent>,
    ) {
        let ledger = Arc::new(Mutex::new(Ledger::new(
            dec!(10000),
            ChronoDuration::seconds(60),
        )));
        let (events, rx) = broadcast::channel(64);
        let manager = ExecutionManager::new(
            gateway,
            Arc::clone(&ledger),
            gate(),
            events,
            Arc::new(NoopSink),
            dec!(0.001),
            Duration::from_millis(timeout_ms),
        );
        (manager, ledger, rx)
    }

    fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn full_pair_books_the_round_trip() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (manager, ledger, _rx) = manager(gateway, 1000);

        manager.execute_approval(approval(), &snapshot()).await.unwrap();

        let ledger = ledger.lock().await;
        // Entry buy 1 @ 100 and exit sell 1 @ 104 both filled: flat, +4 gross.
        assert!(ledger.position("BTCUSDT").is_none());
        assert_eq!(ledger.realized_pnl(), dec!(3.99));
    }

    #[tokio::test]
    async fn failed_partner_leg_flattens_the_filled_leg() {
        // Entry (buy) fills; exit (sell) rejects; the flatten sell then fills.
        let gateway = Arc::new(
            ScriptedGateway::default()
                .script(OrderSide::Sell, vec![Script::Reject, Script::FillAt(dec!(99.9))]),
        );
        let (manager, ledger, mut rx) = manager(gateway, 1000);

        manager.execute_approval(approval(), &snapshot()).await.unwrap();

        let ledger = ledger.lock().await;
        assert!(ledger.position("BTCUSDT").is_none(), "flatten must leave us flat");

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Risk(RiskEvent {
                reason: RejectReason::LegFailure,
                ..
            })
        )));
    }

    #[tokio::test]
    async fn surviving_position_carries_protection_levels() {
        // Entry (buy) fills; exit (sell) rejects; the flatten sell dies on
        // connectivity. The position is stuck open and must carry the
        // approval's stop and target.
        let gateway = Arc::new(
            ScriptedGateway::default()
                .script(OrderSide::Sell, vec![Script::Reject, Script::Connectivity]),
        );
        let (manager, ledger, _rx) = manager(gateway, 1000);

        manager.execute_approval(approval(), &snapshot()).await.unwrap();

        let ledger = ledger.lock().await;
        let position = ledger.position("BTCUSDT").expect("position stays open");
        assert_eq!(position.quantity, dec!(1));
        assert_eq!(position.stop_loss_price, Some(dec!(98)));
        assert_eq!(position.take_profit_price, Some(dec!(104)));
    }

    #[tokio::test]
    async fn partial_fill_on_expired_leg_is_booked() {
        // The entry executes 0.4 of 1 before expiring; the exit rejects.
        // The executed slice must land in the ledger even though both legs
        // count as failed.
        let gateway = Arc::new(
            ScriptedGateway::default()
                .script(OrderSide::Buy, vec![Script::ExpireWithPartial(dec!(0.4))])
                .script(OrderSide::Sell, vec![Script::Reject]),
        );
        let (manager, ledger, mut rx) = manager(gateway, 1000);

        manager.execute_approval(approval(), &snapshot()).await.unwrap();

        let ledger = ledger.lock().await;
        let position = ledger.position("BTCUSDT").expect("partial execution booked");
        assert_eq!(position.quantity, dec!(0.4));
        assert_eq!(position.entry_price, dec!(100));

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::OrderOutcome(OrderOutcome {
                status: LegStatus::Expired,
                ..
            })
        )));
    }

    #[tokio::test]
    async fn connectivity_failures_feed_the_circuit_breaker() {
        let (events, _keep) = broadcast::channel(64);
        let ledger = Arc::new(Mutex::new(Ledger::new(
            dec!(10000),
            ChronoDuration::seconds(60),
        )));
        let gate = gate();
        // Both legs die on connectivity five times over.
        for _ in 0..5 {
            let gateway = Arc::new(
                ScriptedGateway::default()
                    .script(OrderSide::Buy, vec![Script::Connectivity])
                    .script(OrderSide::Sell, vec![Script::Connectivity]),
            );
            let manager = ExecutionManager::new(
                gateway,
                Arc::clone(&ledger),
                Arc::clone(&gate),
                events.clone(),
                Arc::new(NoopSink),
                dec!(0.001),
                Duration::from_millis(1000),
            );
            manager.execute_approval(approval(), &snapshot()).await.unwrap();
        }
        assert!(gate.lock().await.circuit_open());
    }

    #[tokio::test]
    async fn timeout_cancels_both_pending_legs() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .script(OrderSide::Buy, vec![Script::Hang])
                .script(OrderSide::Sell, vec![Script::Hang]),
        );
        let gateway_handle = Arc::clone(&gateway);
        let (manager, ledger, mut rx) = manager(gateway, 50);

        manager.execute_approval(approval(), &snapshot()).await.unwrap();

        assert_eq!(gateway_handle.canceled_count(), 2);
        assert!(ledger.lock().await.position("BTCUSDT").is_none());
        let events = drain(&mut rx);
        let expired = events
            .iter()
            .filter(|e| matches!(
                e,
                EngineEvent::OrderOutcome(OrderOutcome {
                    status: LegStatus::Expired,
                    ..
                })
            ))
            .count();
        assert_eq!(expired, 2);
    }

    #[tokio::test]
    async fn stale_approval_is_dropped_without_submission() {
        let gateway = Arc::new(
            ScriptedGateway::default()
                .script(OrderSide::Buy, vec![])
                .script(OrderSide::Sell, vec![]),
        );
        let (manager, ledger, mut rx) = manager(gateway, 1000);

        let mut stale = approval();
        stale.expires_at = Utc::now() - ChronoDuration::seconds(1);
        manager.execute_approval(stale, &snapshot()).await.unwrap();

        assert_eq!(ledger.lock().await.equity_curve().len(), 1, "no fills applied");
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Risk(RiskEvent {
                reason: RejectReason::StaleApproval,
                ..
            })
        )));
    }

    #[tokio::test]
    async fn drifted_price_aborts_before_submission() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (manager, ledger, mut rx) = manager(gateway, 1000);

        let mut cheap = approval();
        cheap.price = dec!(90); // Market is at 100: >0.1% drift.
        manager.execute_approval(cheap, &snapshot()).await.unwrap();

        assert!(ledger.lock().await.position("BTCUSDT").is_none());
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::Risk(RiskEvent {
                reason: RejectReason::SlippageAbort,
                ..
            })
        )));
    }
}
