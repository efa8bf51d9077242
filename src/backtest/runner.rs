//! Backtest replay engine

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::config::{BacktestConfig, TradingConfig};
use crate::performance::{PerformanceAggregator, PerformanceSummary};
use crate::signal::Signal;
use crate::trading::{Position, ReplayPriceSource, TradeSimulator};

/// Days of drift tolerated when resolving benchmark endpoint prices
const BENCHMARK_TOLERANCE_DAYS: i64 = 7;

/// Complete results of one backtest run
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub summary: PerformanceSummary,
    /// Closed positions, in ledger order
    pub trades: Vec<Position>,
    /// Positions still open when the replay ended
    pub open_at_end: usize,
}

/// Drives the trade simulator over a historical window
pub struct BacktestRunner {
    trading: TradingConfig,
    backtest: BacktestConfig,
}

impl BacktestRunner {
    /// Create a runner from validated configuration
    pub fn new(trading: TradingConfig, backtest: BacktestConfig) -> Self {
        Self { trading, backtest }
    }

    /// Replay signals against historical prices, day by day
    ///
    /// Each day opens entries for that day's signals, then evaluates
    /// every open position, exactly as the live loop does.
    pub fn run(
        &self,
        signals: &[Signal],
        prices: &ReplayPriceSource,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> BacktestResult {
        tracing::info!(%start_date, %end_date, signals = signals.len(), "Running backtest");

        let mut by_date: BTreeMap<NaiveDate, Vec<Signal>> = BTreeMap::new();
        for signal in signals {
            let date = signal.created_at.date_naive();
            if date >= start_date && date <= end_date {
                by_date.entry(date).or_default().push(signal.clone());
            }
        }

        let mut simulator = TradeSimulator::new(self.trading.clone());
        let mut day = start_date;
        while day <= end_date {
            if let Some(day_signals) = by_date.get(&day) {
                simulator.process_signals(day_signals, day, prices);
            }
            simulator.evaluate_day(day, prices);
            let Some(next) = day.succ_opt() else { break };
            day = next;
        }

        let benchmark_return_pct = self.benchmark_return(prices, start_date, end_date);

        let ledger = simulator.ledger();
        let closed = ledger.closed_positions();
        let open = ledger.open_positions();
        let open_snapshots = ledger.latest_open_snapshots();

        let aggregator = PerformanceAggregator::new(&self.backtest);
        let summary = aggregator.summarize(&closed, &open, &open_snapshots, benchmark_return_pct);

        tracing::info!(
            trades = summary.total_trades,
            win_rate = summary.win_rate,
            total_return_pct = summary.total_return_pct,
            "Backtest complete"
        );

        BacktestResult {
            start_date,
            end_date,
            trades: closed.into_iter().cloned().collect(),
            open_at_end: open.len(),
            summary,
        }
    }

    /// Buy-and-hold return of the benchmark ticker over the window
    fn benchmark_return(
        &self,
        prices: &ReplayPriceSource,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> f64 {
        let ticker = &self.backtest.benchmark_ticker;
        let start = prices.nearest_on_or_after(ticker, start_date, BENCHMARK_TOLERANCE_DAYS);
        let end = prices.nearest_on_or_after(ticker, end_date, BENCHMARK_TOLERANCE_DAYS);

        match (start, end) {
            (Some(start), Some(end)) if start > rust_decimal::Decimal::ZERO => {
                f64::try_from((end - start) / start).unwrap_or(0.0) * 100.0
            }
            _ => {
                tracing::warn!(ticker = %ticker, "No benchmark prices for window");
                0.0
            }
        }
    }
}
