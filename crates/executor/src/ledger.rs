use crate::error::ExecutorError;
use chrono::{DateTime, Duration, Utc};
use core_types::{ClosedTrade, EquityPoint, Fill, OrderSide, Position};
use events::PortfolioState;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// The account ledger: cash, open positions, realized results, and the
/// equity curve.
///
/// This is the *only* component that mutates position state, and
/// `apply_fill` is its only mutation entry point. Fills are keyed by
/// client-order-id: a fill must have been registered before submission
/// (anything else is an invariant violation), and applying the same fill
/// twice is a logged no-op.
#[derive(Debug)]
pub struct Ledger {
    pub cash: Decimal,
    positions: HashMap<String, Position>,
    /// Client-order-ids the execution manager has announced.
    expected: HashSet<Uuid>,
    /// Client-order-ids whose fills have already been applied.
    applied: HashSet<Uuid>,
    equity_curve: Vec<EquityPoint>,
    closed_trades: Vec<ClosedTrade>,
    realized_pnl: Decimal,
    fees_paid: Decimal,
    winning_trades: usize,
    losing_trades: usize,
    /// Minimum spacing between mark-to-market equity points. Fills always
    /// append regardless.
    mark_interval: Duration,
    last_mark: Option<DateTime<Utc>>,
}

impl Ledger {
    pub fn new(initial_capital: Decimal, mark_interval: Duration) -> Self {
        Self {
            cash: initial_capital,
            positions: HashMap::new(),
            expected: HashSet::new(),
            applied: HashSet::new(),
            equity_curve: vec![EquityPoint {
                timestamp: Utc::now(),
                equity: initial_capital,
            }],
            closed_trades: Vec::new(),
            realized_pnl: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            winning_trades: 0,
            losing_trades: 0,
            mark_interval,
            last_mark: None,
        }
    }

    /// Announces an order leg before submission so its eventual fill is
    /// recognized.
    pub fn register_order(&mut self, client_order_id: Uuid) {
        self.expected.insert(client_order_id);
    }

    /// Applies one confirmed fill. Returns `false` when the fill was a
    /// duplicate and nothing changed.
    pub fn apply_fill(&mut self, fill: &Fill) -> Result<bool, ExecutorError> {
        if self.applied.contains(&fill.client_order_id) {
            tracing::debug!(
                client_order_id = %fill.client_order_id,
                "duplicate fill confirmation ignored"
            );
            return Ok(false);
        }
        if !self.expected.contains(&fill.client_order_id) {
            return Err(ExecutorError::UnknownFill(fill.client_order_id));
        }

        // --- Cash ---
        let gross = fill.price * fill.quantity;
        match fill.side {
            OrderSide::Buy => self.cash -= gross,
            OrderSide::Sell => self.cash += gross,
        }
        self.cash -= fill.fee;
        self.fees_paid += fill.fee;

        // --- Position ---
        match self.positions.remove(&fill.symbol) {
            None => {
                self.positions.insert(fill.symbol.clone(), Position {
                    symbol: fill.symbol.clone(),
                    side: fill.side,
                    quantity: fill.quantity,
                    entry_price: fill.price,
                    unrealized_pnl: Decimal::ZERO,
                    stop_loss_price: None,
                    take_profit_price: None,
                    last_updated: fill.timestamp,
                });
            }
            Some(mut position) if position.side == fill.side => {
                // Same direction: increase with a volume-weighted entry.
                let existing_value = position.entry_price * position.quantity;
                let added_value = fill.price * fill.quantity;
                let total_quantity = position.quantity + fill.quantity;
                position.entry_price = (existing_value + added_value) / total_quantity;
                position.quantity = total_quantity;
                position.last_updated = fill.timestamp;
                self.positions.insert(fill.symbol.clone(), position);
            }
            Some(mut position) => {
                // Opposite direction: reduce, close, or flip.
                let closed_quantity = position.quantity.min(fill.quantity);
                let pnl_per_unit = match position.side {
                    OrderSide::Buy => fill.price - position.entry_price,
                    OrderSide::Sell => position.entry_price - fill.price,
                };
                let pnl = pnl_per_unit * closed_quantity - fill.fee;
                self.record_closed_trade(&position, fill, closed_quantity, pnl);

                if fill.quantity < position.quantity {
                    position.quantity -= fill.quantity;
                    position.last_updated = fill.timestamp;
                    self.positions.insert(fill.symbol.clone(), position);
                } else if fill.quantity > position.quantity {
                    // Flip: the remainder opens a fresh position at the fill
                    // price. The old entry price does not carry over.
                    self.positions.insert(fill.symbol.clone(), Position {
                        symbol: fill.symbol.clone(),
                        side: fill.side,
                        quantity: fill.quantity - position.quantity,
                        entry_price: fill.price,
                        unrealized_pnl: Decimal::ZERO,
                        stop_loss_price: None,
                        take_profit_price: None,
                        last_updated: fill.timestamp,
                    });
                }
                // Exactly equal: the position is gone.
            }
        }

        self.applied.insert(fill.client_order_id);

        // Fills always produce an equity point.
        let equity = self.equity_with(&HashMap::from([(fill.symbol.clone(), fill.price)]));
        self.push_equity(fill.timestamp, equity);

        Ok(true)
    }

    fn record_closed_trade(
        &mut self,
        position: &Position,
        fill: &Fill,
        closed_quantity: Decimal,
        pnl: Decimal,
    ) {
        self.realized_pnl += pnl;
        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
        self.closed_trades.push(ClosedTrade {
            symbol: position.symbol.clone(),
            side: position.side,
            quantity: closed_quantity,
            entry_price: position.entry_price,
            exit_price: fill.price,
            pnl,
            fee: fill.fee,
            closed_at: fill.timestamp,
        });
        tracing::info!(
            symbol = %position.symbol,
            %pnl,
            quantity = %closed_quantity,
            "position closed"
        );
    }

    /// Attaches protective levels to an open position.
    pub fn set_protections(
        &mut self,
        symbol: &str,
        stop_loss_price: Decimal,
        take_profit_price: Decimal,
    ) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.stop_loss_price = Some(stop_loss_price);
            position.take_profit_price = Some(take_profit_price);
        }
    }

    /// Recomputes unrealized PnL at the given prices and appends an equity
    /// point, subject to the configured mark interval.
    pub fn mark_to_market(&mut self, prices: &HashMap<String, Decimal>, now: DateTime<Utc>) {
        for position in self.positions.values_mut() {
            if let Some(price) = prices.get(&position.symbol) {
                let pnl_per_unit = match position.side {
                    OrderSide::Buy => *price - position.entry_price,
                    OrderSide::Sell => position.entry_price - *price,
                };
                position.unrealized_pnl = pnl_per_unit * position.quantity;
            }
        }

        if let Some(last) = self.last_mark {
            if now - last < self.mark_interval {
                return;
            }
        }
        self.last_mark = Some(now);
        let equity = self.equity_with(prices);
        self.push_equity(now, equity);
    }

    /// Total equity at the given prices: cash plus the signed market value of
    /// every open position. Positions without a price are valued at entry.
    pub fn total_equity(&self, prices: &HashMap<String, Decimal>) -> Decimal {
        self.equity_with(prices)
    }

    fn equity_with(&self, prices: &HashMap<String, Decimal>) -> Decimal {
        let mut equity = self.cash;
        for position in self.positions.values() {
            let price = prices
                .get(&position.symbol)
                .copied()
                .unwrap_or(position.entry_price);
            match position.side {
                OrderSide::Buy => equity += price * position.quantity,
                OrderSide::Sell => equity -= price * position.quantity,
            }
        }
        equity
    }

    fn push_equity(&mut self, timestamp: DateTime<Utc>, equity: Decimal) {
        // The curve is append-only with non-decreasing timestamps; a late
        // fill is clamped onto the end rather than inserted into the past.
        let timestamp = match self.equity_curve.last() {
            Some(last) if timestamp < last.timestamp => last.timestamp,
            _ => timestamp,
        };
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    pub fn portfolio_state(&self, prices: &HashMap<String, Decimal>, now: DateTime<Utc>) -> PortfolioState {
        PortfolioState {
            timestamp: now,
            cash: self.cash,
            total_value: self.equity_with(prices),
            positions: self.positions.values().cloned().collect(),
        }
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn open_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn fees_paid(&self) -> Decimal {
        self.fees_paid
    }

    pub fn win_loss(&self) -> (usize, usize) {
        (self.winning_trades, self.losing_trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ledger() -> Ledger {
        Ledger::new(dec!(10000), Duration::seconds(60))
    }

    fn fill(id: Uuid, side: OrderSide, price: Decimal, quantity: Decimal) -> Fill {
        Fill {
            client_order_id: id,
            symbol: "BTCUSDT".to_string(),
            side,
            price,
            quantity,
            fee: dec!(0.1),
            timestamp: Utc::now(),
        }
    }

    fn apply(ledger: &mut Ledger, side: OrderSide, price: Decimal, quantity: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        ledger.register_order(id);
        assert!(ledger.apply_fill(&fill(id, side, price, quantity)).unwrap());
        id
    }

    #[test]
    fn position_quantity_equals_sum_of_fills() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(1));
        apply(&mut ledger, OrderSide::Buy, dec!(110), dec!(1));

        let position = ledger.position("BTCUSDT").unwrap();
        assert_eq!(position.quantity, dec!(2));
        assert_eq!(position.entry_price, dec!(105)); // volume-weighted
        assert_eq!(ledger.cash, dec!(10000) - dec!(210) - dec!(0.2));
    }

    #[test]
    fn duplicate_fill_is_an_idempotent_noop() {
        let mut ledger = ledger();
        let id = Uuid::new_v4();
        ledger.register_order(id);
        let fill = fill(id, OrderSide::Buy, dec!(100), dec!(1));

        assert!(ledger.apply_fill(&fill).unwrap());
        let cash_after_first = ledger.cash;
        let curve_len = ledger.equity_curve().len();

        assert!(!ledger.apply_fill(&fill).unwrap());
        assert_eq!(ledger.cash, cash_after_first);
        assert_eq!(ledger.position("BTCUSDT").unwrap().quantity, dec!(1));
        assert_eq!(ledger.equity_curve().len(), curve_len);
    }

    #[test]
    fn unregistered_fill_is_an_error() {
        let mut ledger = ledger();
        let stray = fill(Uuid::new_v4(), OrderSide::Buy, dec!(100), dec!(1));
        assert!(matches!(
            ledger.apply_fill(&stray),
            Err(ExecutorError::UnknownFill(_))
        ));
    }

    #[test]
    fn closing_a_position_realizes_pnl_after_fees() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(2));
        apply(&mut ledger, OrderSide::Sell, dec!(105), dec!(2));

        assert!(ledger.position("BTCUSDT").is_none());
        // (105 - 100) * 2 - 0.1 exit fee
        assert_eq!(ledger.realized_pnl(), dec!(9.9));
        assert_eq!(ledger.win_loss(), (1, 0));
        assert_eq!(ledger.closed_trades().len(), 1);
    }

    #[test]
    fn losing_round_trip_counts_as_loss() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(1));
        apply(&mut ledger, OrderSide::Sell, dec!(99), dec!(1));
        assert_eq!(ledger.win_loss(), (0, 1));
        assert_eq!(ledger.realized_pnl(), dec!(-1.1));
    }

    #[test]
    fn flip_resets_the_entry_price() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(1));
        // Sell 3 against a long 1: close 1, open short 2 at the flip price.
        apply(&mut ledger, OrderSide::Sell, dec!(102), dec!(3));

        let position = ledger.position("BTCUSDT").unwrap();
        assert_eq!(position.side, OrderSide::Sell);
        assert_eq!(position.quantity, dec!(2));
        assert_eq!(position.entry_price, dec!(102));
        // The closed portion realized (102 - 100) * 1 - 0.1.
        assert_eq!(ledger.realized_pnl(), dec!(1.9));
    }

    #[test]
    fn short_round_trip_values_correctly() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Sell, dec!(100), dec!(1));
        let equity = ledger.total_equity(&HashMap::from([("BTCUSDT".to_string(), dec!(95))]));
        // Short 1 at 100: cash 10099.9, position owes 95.
        assert_eq!(equity, dec!(10004.9));

        apply(&mut ledger, OrderSide::Buy, dec!(95), dec!(1));
        assert_eq!(ledger.realized_pnl(), dec!(4.9));
    }

    #[test]
    fn equity_curve_is_append_only_with_monotone_timestamps() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(1));

        // A fill stamped in the past still lands at the end of the curve.
        let id = Uuid::new_v4();
        ledger.register_order(id);
        let mut old_fill = fill(id, OrderSide::Buy, dec!(100), dec!(1));
        old_fill.timestamp = Utc::now() - Duration::hours(1);
        ledger.apply_fill(&old_fill).unwrap();

        let curve = ledger.equity_curve();
        assert!(curve.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn mark_to_market_is_rate_limited_but_fills_are_not() {
        let mut ledger = ledger();
        let now = Utc::now();
        let prices = HashMap::from([("BTCUSDT".to_string(), dec!(100))]);

        ledger.mark_to_market(&prices, now);
        let len_after_first = ledger.equity_curve().len();

        // Too soon: no new point.
        ledger.mark_to_market(&prices, now + Duration::seconds(10));
        assert_eq!(ledger.equity_curve().len(), len_after_first);

        // Past the interval: appended.
        ledger.mark_to_market(&prices, now + Duration::seconds(61));
        assert_eq!(ledger.equity_curve().len(), len_after_first + 1);

        // A fill appends regardless of the mark interval.
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(1));
        assert_eq!(ledger.equity_curve().len(), len_after_first + 2);
    }

    #[test]
    fn mark_updates_unrealized_pnl() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(2));
        let prices = HashMap::from([("BTCUSDT".to_string(), dec!(103))]);
        ledger.mark_to_market(&prices, Utc::now());
        assert_eq!(ledger.position("BTCUSDT").unwrap().unrealized_pnl, dec!(6));
    }

    #[test]
    fn protections_attach_to_open_positions() {
        let mut ledger = ledger();
        apply(&mut ledger, OrderSide::Buy, dec!(100), dec!(1));
        ledger.set_protections("BTCUSDT", dec!(98), dec!(104));
        let position = ledger.position("BTCUSDT").unwrap();
        assert_eq!(position.stop_loss_price, Some(dec!(98)));
        assert_eq!(position.take_profit_price, Some(dec!(104)));
    }
}
