use crate::breaker::CircuitBreaker;
use crate::error::RiskError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use configuration::{CircuitBreakerSettings, RiskSettings};
use core_types::{Approval, OrderSide, RejectReason, RiskDecision, SignalIntent};
use events::PortfolioState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// The risk gate. See the crate docs for the check ordering contract.
pub struct RiskGate {
    params: RiskSettings,
    breaker: CircuitBreaker,
    /// Highest total equity ever observed; drawdown is measured from here.
    peak_equity: Decimal,
    /// Set while the drawdown halt is engaged. Clears on its own when the
    /// drawdown recovers below half the configured limit.
    drawdown_halted: bool,
    /// Equity at the first evaluation of the current UTC day.
    day_start_equity: Decimal,
    day: Option<NaiveDate>,
}

impl RiskGate {
    pub fn new(
        params: RiskSettings,
        breaker_params: &CircuitBreakerSettings,
        initial_equity: Decimal,
    ) -> Result<Self, RiskError> {
        if initial_equity <= Decimal::ZERO {
            return Err(RiskError::InvalidParameters(
                "initial equity must be positive".to_string(),
            ));
        }
        Ok(Self {
            params,
            breaker: CircuitBreaker::new(
                breaker_params.error_threshold,
                Duration::seconds(breaker_params.cooldown_secs as i64),
            ),
            peak_equity: initial_equity,
            drawdown_halted: false,
            day_start_equity: initial_equity,
            day: None,
        })
    }

    /// Runs the ordered checks against one intent.
    ///
    /// The first failing check wins and produces a coded rejection. A passing
    /// intent yields a one-shot `Approval` whose quantity may be smaller than
    /// requested, never larger.
    pub fn evaluate(
        &mut self,
        intent: &SignalIntent,
        portfolio: &PortfolioState,
        now: DateTime<Utc>,
    ) -> RiskDecision {
        let equity = portfolio.total_value;
        self.roll_day(now, equity);
        self.track_drawdown(equity);

        // 1. Circuit breaker. An open breaker is offered a reset on every
        //    evaluation; the attempt only succeeds once the cooldown has
        //    elapsed, so the halt clears on its own when the venue has had
        //    its quiet period.
        if self.breaker.is_open() && !self.breaker.try_reset(now) {
            return RiskDecision::Rejected(RejectReason::CircuitOpen);
        }

        // 2. Drawdown halt.
        if self.drawdown_halted {
            return RiskDecision::Rejected(RejectReason::DrawdownHalt);
        }

        // 3. Open position cap. Intents for a symbol we already hold manage
        //    that position; only new symbols consume a slot.
        if portfolio.position_for(&intent.symbol).is_none()
            && portfolio.open_positions() >= self.params.max_open_positions
        {
            return RiskDecision::Rejected(RejectReason::MaxPositions);
        }

        // 4. Per-trade risk, scaling down instead of rejecting.
        let quantity = match self.size_quantity(intent, equity) {
            Ok(quantity) => quantity,
            Err(reason) => return RiskDecision::Rejected(reason),
        };

        // 5. Daily loss limit.
        if self.day_start_equity > Decimal::ZERO {
            let daily_loss = (self.day_start_equity - equity) / self.day_start_equity;
            if daily_loss >= self.params.daily_loss_limit_pct {
                tracing::warn!(%daily_loss, "daily loss limit reached");
                return RiskDecision::Rejected(RejectReason::DailyLossLimit);
            }
        }

        let (stop_loss_price, take_profit_price) = match intent.side {
            OrderSide::Buy => (
                intent.target_price * (dec!(1) - self.params.stop_loss_pct),
                intent.target_price * (dec!(1) + self.params.take_profit_pct),
            ),
            OrderSide::Sell => (
                intent.target_price * (dec!(1) + self.params.stop_loss_pct),
                intent.target_price * (dec!(1) - self.params.take_profit_pct),
            ),
        };

        RiskDecision::Approved(Approval {
            approval_id: Uuid::new_v4(),
            intent_id: intent.intent_id,
            symbol: intent.symbol.clone(),
            side: intent.side,
            price: intent.target_price,
            quantity,
            stop_loss_price,
            take_profit_price,
            expires_at: now + Duration::milliseconds(self.params.approval_staleness_ms as i64),
        })
    }

    /// Computes the approved quantity, shrinking the request to the per-trade
    /// risk budget when needed.
    fn size_quantity(&self, intent: &SignalIntent, equity: Decimal) -> Result<Decimal, RejectReason> {
        if intent.target_price <= Decimal::ZERO || intent.notional_usd <= Decimal::ZERO {
            return Err(RejectReason::BelowMinNotional);
        }

        let requested_quantity = intent.notional_usd / intent.target_price;
        let risk_per_unit = intent.target_price * self.params.stop_loss_pct;
        let risk_amount = requested_quantity * risk_per_unit;
        let allowed_risk = equity * self.params.max_risk_per_trade_pct;

        let quantity = if risk_amount > allowed_risk {
            let scaled = allowed_risk / risk_per_unit;
            tracing::info!(
                symbol = %intent.symbol,
                requested = %requested_quantity,
                %scaled,
                "scaling order down to the per-trade risk budget"
            );
            scaled
        } else {
            requested_quantity
        };

        if quantity * intent.target_price < self.params.min_order_notional_usd {
            return Err(RejectReason::BelowMinNotional);
        }
        Ok(quantity)
    }

    /// Updates peak equity and the drawdown halt, including the recovery rule:
    /// the halt clears once drawdown falls below half the configured limit.
    fn track_drawdown(&mut self, equity: Decimal) {
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity <= Decimal::ZERO {
            return;
        }
        let drawdown = (self.peak_equity - equity) / self.peak_equity;

        if !self.drawdown_halted && drawdown >= self.params.max_drawdown_pct {
            tracing::error!(%drawdown, "max drawdown breached, halting new entries");
            self.drawdown_halted = true;
        } else if self.drawdown_halted && drawdown < self.params.max_drawdown_pct / dec!(2) {
            tracing::info!(%drawdown, "drawdown recovered, resuming entries");
            self.drawdown_halted = false;
        }
    }

    fn roll_day(&mut self, now: DateTime<Utc>, equity: Decimal) {
        let today = now.date_naive();
        if self.day != Some(today) {
            self.day = Some(today);
            self.day_start_equity = equity;
        }
    }

    /// Reports a gateway/order failure into the breaker. Returns true when
    /// this failure tripped it.
    pub fn record_order_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.breaker.record_failure(now)
    }

    pub fn record_order_success(&mut self) {
        self.breaker.record_success();
    }

    /// Explicit operator/engine action to close the breaker after cooldown.
    pub fn try_reset_circuit_breaker(&mut self, now: DateTime<Utc>) -> bool {
        self.breaker.try_reset(now)
    }

    pub fn circuit_open(&self) -> bool {
        self.breaker.is_open()
    }
}
