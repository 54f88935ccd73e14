use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use core_types::{ClosedTrade, EquityPoint};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// A stateless calculator for deriving performance metrics from the equity
/// curve and closed-trade history.
#[derive(Debug)]
pub struct PerformanceEvaluator {
    /// Multiplier applied to the per-period Sharpe ratio (1 = non-annualized).
    sharpe_annualization: Decimal,
}

impl PerformanceEvaluator {
    pub fn new(sharpe_annualization: Decimal) -> Self {
        Self {
            sharpe_annualization,
        }
    }

    /// Computes the full report. Degenerate inputs produce sentinel values
    /// (`None` ratios, zeroed metrics) rather than errors wherever the metric
    /// is simply undefined.
    pub fn calculate(
        &self,
        trades: &[ClosedTrade],
        equity_curve: &[EquityPoint],
        initial_capital: Decimal,
    ) -> Result<PerformanceReport, AnalyticsError> {
        if initial_capital <= Decimal::ZERO {
            return Err(AnalyticsError::InvalidInput(
                "initial capital must be positive".to_string(),
            ));
        }

        let mut report = PerformanceReport::new();

        self.calculate_trade_stats(trades, &mut report);
        self.calculate_return(equity_curve, initial_capital, &mut report);
        self.calculate_drawdown(equity_curve, &mut report);
        self.calculate_sharpe(equity_curve, &mut report)?;

        Ok(report)
    }

    fn calculate_trade_stats(&self, trades: &[ClosedTrade], report: &mut PerformanceReport) {
        report.total_trades = trades.len();
        for trade in trades {
            report.realized_pnl += trade.pnl;
            report.fees_paid += trade.fee;
            // A trade must beat its fees to count as a win.
            if trade.pnl > Decimal::ZERO {
                report.winning_trades += 1;
            } else {
                report.losing_trades += 1;
            }
        }
        if report.total_trades > 0 {
            report.win_rate_pct = Some(
                Decimal::from(report.winning_trades) / Decimal::from(report.total_trades)
                    * Decimal::from(100),
            );
        }
    }

    fn calculate_return(
        &self,
        equity_curve: &[EquityPoint],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) {
        let Some(last) = equity_curve.last() else {
            return;
        };
        report.total_return_pct =
            (last.equity - initial_capital) / initial_capital * Decimal::from(100);
    }

    /// Maximum peak-to-trough decline as a fraction of the running peak.
    fn calculate_drawdown(&self, equity_curve: &[EquityPoint], report: &mut PerformanceReport) {
        let Some(first) = equity_curve.first() else {
            return;
        };
        let mut peak = first.equity;
        let mut max_drawdown = Decimal::ZERO;

        for point in equity_curve {
            if point.equity > peak {
                peak = point.equity;
            }
            if peak > Decimal::ZERO {
                let drawdown = (peak - point.equity) / peak;
                if drawdown > max_drawdown {
                    max_drawdown = drawdown;
                }
            }
        }
        report.max_drawdown = max_drawdown;
    }

    fn calculate_sharpe(
        &self,
        equity_curve: &[EquityPoint],
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        let returns: Vec<Decimal> = equity_curve
            .windows(2)
            .filter(|w| !w[0].equity.is_zero())
            .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
            .collect();

        if returns.len() < 2 {
            report.sharpe_ratio = None;
            return Ok(());
        }

        let n = Decimal::from(returns.len());
        let mean = returns.iter().sum::<Decimal>() / n;

        // Sample variance (Bessel's correction): we observe a sample of the
        // return process, not the whole population.
        let variance = returns
            .iter()
            .map(|r| (*r - mean) * (*r - mean))
            .sum::<Decimal>()
            / (n - Decimal::ONE);

        if variance <= Decimal::ZERO {
            // Constant returns: Sharpe is undefined, not infinite.
            report.sharpe_ratio = None;
            return Ok(());
        }

        let std_dev = variance.sqrt().ok_or_else(|| {
            AnalyticsError::Calculation("variance square root failed".to_string())
        })?;

        report.sharpe_ratio = Some(mean / std_dev * self.sharpe_annualization);
        Ok(())
    }
}
