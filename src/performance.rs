//! Performance aggregation over position sets
//!
//! Reduces closed and open positions into summary statistics. All
//! inputs are read-only; nothing here mutates the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::trading::{Position, Snapshot};

/// Summary statistics for a set of positions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Fraction of closed trades that were profitable
    pub win_rate: f64,
    pub avg_return_pct: f64,
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    pub total_pnl: Decimal,
    /// Total P&L over initial capital, as a percentage
    pub total_return_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
    pub avg_days_held: f64,
    /// Largest peak-to-trough equity decline, as a percentage
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    /// Buy-and-hold benchmark return over the same window
    pub benchmark_return_pct: f64,
    /// Strategy return minus benchmark return
    pub alpha: f64,
    pub open_count: usize,
    pub open_deployed: Decimal,
    pub open_unrealized_pnl: Decimal,
    pub open_unrealized_pct: f64,
}

impl PerformanceSummary {
    /// Format as a table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               PERFORMANCE SUMMARY
══════════════════════════════════════════════════════

TRADES
───────────────────────────────────────────────────────
Closed:           {}
Winners:          {} ({:.1}%)
Losers:           {}
Avg Hold:         {:.1} days

PERFORMANCE
───────────────────────────────────────────────────────
Total P&L:        {:+.2}
Total Return:     {:+.2}%
Avg Return:       {:+.2}%
Best Trade:       {:+.2}%
Worst Trade:      {:+.2}%

RISK
───────────────────────────────────────────────────────
Max Drawdown:     {:.2}%
Sharpe Ratio:     {:.2}

BENCHMARK
───────────────────────────────────────────────────────
Buy & Hold:       {:+.2}%
Alpha:            {:+.2}%

OPEN POSITIONS
───────────────────────────────────────────────────────
Count:            {}
Deployed:         {:.2}
Unrealized P&L:   {:+.2} ({:+.2}%)
══════════════════════════════════════════════════════
"#,
            self.total_trades,
            self.winning_trades,
            self.win_rate * 100.0,
            self.losing_trades,
            self.avg_days_held,
            self.total_pnl,
            self.total_return_pct,
            self.avg_return_pct,
            self.best_trade_pct,
            self.worst_trade_pct,
            self.max_drawdown_pct,
            self.sharpe_ratio,
            self.benchmark_return_pct,
            self.alpha,
            self.open_count,
            self.open_deployed,
            self.open_unrealized_pnl,
            self.open_unrealized_pct,
        )
    }
}

/// Computes summary statistics from position sets
pub struct PerformanceAggregator {
    initial_capital: Decimal,
    periods_per_year: f64,
    risk_free_rate: f64,
}

impl PerformanceAggregator {
    /// Create an aggregator from validated configuration
    pub fn new(config: &BacktestConfig) -> Self {
        Self {
            initial_capital: config.initial_capital,
            periods_per_year: config.periods_per_year,
            risk_free_rate: config.risk_free_rate,
        }
    }

    /// Summarize closed positions plus the open book
    ///
    /// `benchmark_return_pct` is the buy-and-hold return of the
    /// benchmark ticker over the same window, when the caller has one.
    pub fn summarize(
        &self,
        closed: &[&Position],
        open: &[&Position],
        open_snapshots: &[&Snapshot],
        benchmark_return_pct: f64,
    ) -> PerformanceSummary {
        let exits: Vec<_> = {
            let mut with_exit: Vec<_> = closed
                .iter()
                .filter_map(|p| p.exit.as_ref().map(|e| (*p, e)))
                .collect();
            with_exit.sort_by_key(|(_, e)| e.exit_date);
            with_exit
        };

        let total_trades = exits.len();
        let winners: Vec<f64> = exits
            .iter()
            .filter(|(_, e)| e.profit_loss > Decimal::ZERO)
            .map(|(_, e)| to_f64(e.return_pct))
            .collect();
        let losers: Vec<f64> = exits
            .iter()
            .filter(|(_, e)| e.profit_loss < Decimal::ZERO)
            .map(|(_, e)| to_f64(e.return_pct))
            .collect();

        let returns_pct: Vec<f64> = exits.iter().map(|(_, e)| to_f64(e.return_pct)).collect();
        let total_pnl: Decimal = exits.iter().map(|(_, e)| e.profit_loss).sum();
        let total_return_pct = to_f64(total_pnl / self.initial_capital) * 100.0;

        let equity_curve = self.equity_curve(&exits);
        let max_drawdown_pct = max_drawdown(&equity_curve);

        let per_trade_returns: Vec<f64> = returns_pct.iter().map(|r| r / 100.0).collect();
        let sharpe_ratio = self.sharpe_ratio(&per_trade_returns);

        let open_deployed: Decimal = open.iter().map(|p| p.position_size).sum();
        let open_unrealized_pnl: Decimal = open_snapshots.iter().map(|s| s.unrealized_pnl).sum();
        let open_unrealized_pct = mean(
            &open_snapshots
                .iter()
                .map(|s| to_f64(s.unrealized_pct))
                .collect::<Vec<_>>(),
        );

        PerformanceSummary {
            total_trades,
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate: if total_trades > 0 {
                winners.len() as f64 / total_trades as f64
            } else {
                0.0
            },
            avg_return_pct: mean(&returns_pct),
            avg_win_pct: mean(&winners),
            avg_loss_pct: mean(&losers),
            total_pnl,
            total_return_pct,
            best_trade_pct: returns_pct.iter().cloned().fold(f64::NAN, f64::max).nan_to_zero(),
            worst_trade_pct: returns_pct.iter().cloned().fold(f64::NAN, f64::min).nan_to_zero(),
            avg_days_held: mean(
                &exits
                    .iter()
                    .map(|(_, e)| e.days_held as f64)
                    .collect::<Vec<_>>(),
            ),
            max_drawdown_pct,
            sharpe_ratio,
            benchmark_return_pct,
            alpha: total_return_pct - benchmark_return_pct,
            open_count: open.len(),
            open_deployed,
            open_unrealized_pnl,
            open_unrealized_pct,
        }
    }

    /// Equity curve from initial capital plus closed P&L in exit order
    fn equity_curve(&self, exits: &[(&Position, &crate::trading::ExitRecord)]) -> Vec<f64> {
        let mut curve = vec![to_f64(self.initial_capital)];
        let mut equity = self.initial_capital;
        for (_, exit) in exits {
            equity += exit.profit_loss;
            curve.push(to_f64(equity));
        }
        curve
    }

    /// Mean per-trade excess return over its standard deviation,
    /// annualized by the configured periods-per-year factor
    pub fn sharpe_ratio(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let per_period_rf = self.risk_free_rate / self.periods_per_year;
        let excess: Vec<f64> = returns.iter().map(|r| r - per_period_rf).collect();
        let std = std_dev(&excess);
        if std == 0.0 {
            return 0.0;
        }
        mean(&excess) / std * self.periods_per_year.sqrt()
    }
}

/// Largest peak-to-trough decline in an equity curve, as a percentage
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let mut peak = equity_curve[0];
    let mut max_dd: f64 = 0.0;
    for value in equity_curve {
        if *value > peak {
            peak = *value;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak * 100.0);
        }
    }
    max_dd
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn to_f64(value: Decimal) -> f64 {
    f64::try_from(value).unwrap_or(0.0)
}

trait NanToZero {
    fn nan_to_zero(self) -> f64;
}

impl NanToZero for f64 {
    fn nan_to_zero(self) -> f64 {
        if self.is_nan() {
            0.0
        } else {
            self
        }
    }
}
