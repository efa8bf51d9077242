//! Trade lifecycle state machine
//!
//! Positions move OPEN -> CLOSED under a fixed exit-priority policy:
//! stop-loss, then take-profit, then time limit. A day that breaches
//! both stop and target closes as a stop-loss.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{ExitReason, ExitRecord, Position, PositionLedger, PositionStatus, PriceSource, Snapshot};
use crate::config::TradingConfig;
use crate::signal::Signal;
use crate::telemetry::{set_gauge, GaugeMetric};

/// Result of attempting to open a position from a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Position created
    Opened,
    /// A position for this (ticker, entry date) already exists
    Duplicate,
    /// Open position limit reached
    MaxPositionsReached,
    /// Signal conviction below the entry floor
    BelowConviction,
    /// No usable entry price
    Unpriced,
    /// Sized position too small for a single share
    ZeroShares,
}

/// Counters from a backfill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillStats {
    pub created: usize,
    pub skipped: usize,
}

/// Simulates positions against signals; shared by paper trading and
/// backtesting
pub struct TradeSimulator {
    config: TradingConfig,
    ledger: PositionLedger,
}

impl TradeSimulator {
    /// Create a simulator from validated configuration
    pub fn new(config: TradingConfig) -> Self {
        Self {
            config,
            ledger: PositionLedger::new(),
        }
    }

    /// Conviction-weighted position size
    ///
    /// conviction 50 -> 1x base, conviction 100 -> 2x base.
    pub fn position_size(&self, conviction: f64) -> Decimal {
        let fifty = Decimal::from(50);
        let conviction = Decimal::try_from(conviction).unwrap_or(fifty);
        let multiplier = Decimal::ONE + (conviction - fifty) / fifty;
        self.config.base_position_size * multiplier
    }

    /// Attempt to open a position from a signal at a known entry price
    pub fn open_from_signal(
        &mut self,
        signal: &Signal,
        entry_date: NaiveDate,
        entry_price: Decimal,
    ) -> EntryOutcome {
        if signal.conviction < self.config.min_conviction {
            tracing::debug!(
                ticker = %signal.ticker,
                conviction = signal.conviction,
                "Signal below entry conviction, skipping"
            );
            return EntryOutcome::BelowConviction;
        }

        if self.ledger.contains(&signal.ticker, entry_date) {
            tracing::debug!(
                ticker = %signal.ticker,
                %entry_date,
                "Position already exists, skipping"
            );
            return EntryOutcome::Duplicate;
        }

        if self.ledger.open_count() >= self.config.max_open_positions {
            tracing::warn!(
                ticker = %signal.ticker,
                max = self.config.max_open_positions,
                "Max open positions reached, skipping"
            );
            return EntryOutcome::MaxPositionsReached;
        }

        if entry_price <= Decimal::ZERO {
            tracing::warn!(ticker = %signal.ticker, "No usable entry price, skipping");
            return EntryOutcome::Unpriced;
        }

        let target_size = self.position_size(signal.conviction);
        let shares = match (target_size / entry_price).floor().to_u64() {
            Some(shares) if shares > 0 => shares,
            _ => {
                tracing::debug!(ticker = %signal.ticker, %entry_price, "Sized to zero shares, skipping");
                return EntryOutcome::ZeroShares;
            }
        };
        let position_size = entry_price * Decimal::from(shares);

        let hundred = Decimal::from(100);
        let position = Position {
            ticker: signal.ticker.clone(),
            entry_date,
            entry_price,
            shares,
            position_size,
            conviction: signal.conviction,
            signal_types: signal.triggers.clone(),
            stop_loss_price: entry_price * (Decimal::ONE + self.config.stop_loss_pct / hundred),
            target_price: entry_price * (Decimal::ONE + self.config.take_profit_pct / hundred),
            status: PositionStatus::Open,
            exit: None,
        };

        self.ledger.insert(position);
        tracing::info!(
            ticker = %signal.ticker,
            shares,
            %entry_price,
            %position_size,
            conviction = signal.conviction,
            "Opened position"
        );
        set_gauge(GaugeMetric::OpenPositions, self.ledger.open_count() as f64);
        EntryOutcome::Opened
    }

    /// Open positions for a batch of signals dated `date`
    ///
    /// Entry price comes from the price source, falling back to the
    /// price captured on the signal itself.
    pub fn process_signals(
        &mut self,
        signals: &[Signal],
        date: NaiveDate,
        prices: &dyn PriceSource,
    ) -> usize {
        let mut opened = 0;
        for signal in signals {
            let entry_price = prices
                .price(&signal.ticker, date)
                .or(signal.price_at_signal);
            let Some(entry_price) = entry_price else {
                tracing::warn!(ticker = %signal.ticker, %date, "No entry price for signal, skipping");
                continue;
            };
            if self.open_from_signal(signal, date, entry_price) == EntryOutcome::Opened {
                opened += 1;
            }
        }
        opened
    }

    /// Mark all open positions for one day and apply exit conditions
    ///
    /// A position with no price for the day is skipped untouched.
    /// Returns the keys of positions closed on this day.
    pub fn evaluate_day(
        &mut self,
        date: NaiveDate,
        prices: &dyn PriceSource,
    ) -> Vec<(String, NaiveDate)> {
        let mut closed = Vec::new();

        for (ticker, entry_date) in self.ledger.open_keys() {
            let Some(current_price) = prices.price(&ticker, date) else {
                tracing::warn!(%ticker, %date, "No current price, skipping update");
                continue;
            };

            let position = match self.ledger.get(&ticker, entry_date) {
                Some(p) => p.clone(),
                None => continue,
            };

            self.ledger.record_snapshot(Snapshot {
                ticker: ticker.clone(),
                entry_date,
                date,
                current_price,
                unrealized_pnl: position.unrealized_pnl(current_price),
                unrealized_pct: position.unrealized_pct(current_price),
            });

            let days_held = position.days_held_at(date);
            let exit_reason = if current_price <= position.stop_loss_price {
                Some(ExitReason::StopLoss)
            } else if current_price >= position.target_price {
                Some(ExitReason::TakeProfit)
            } else if days_held >= self.config.hold_days {
                Some(ExitReason::TimeLimit)
            } else {
                None
            };

            if let Some(reason) = exit_reason {
                self.close_position(&position, date, current_price, reason, days_held);
                closed.push((ticker, entry_date));
            }
        }

        set_gauge(GaugeMetric::OpenPositions, self.ledger.open_count() as f64);
        closed
    }

    /// Close a position by operator request at a known price
    pub fn close_manual(
        &mut self,
        ticker: &str,
        entry_date: NaiveDate,
        date: NaiveDate,
        price: Decimal,
    ) -> bool {
        let Some(position) = self.ledger.get(ticker, entry_date).cloned() else {
            return false;
        };
        if !position.is_open() {
            return false;
        }
        let days_held = position.days_held_at(date);
        self.close_position(&position, date, price, ExitReason::Manual, days_held);
        true
    }

    fn close_position(
        &mut self,
        position: &Position,
        exit_date: NaiveDate,
        exit_price: Decimal,
        reason: ExitReason,
        days_held: i64,
    ) {
        let profit_loss = (exit_price - position.entry_price) * Decimal::from(position.shares);
        let return_pct =
            (exit_price - position.entry_price) / position.entry_price * Decimal::from(100);

        self.ledger.close(
            &position.ticker,
            position.entry_date,
            ExitRecord {
                exit_date,
                exit_price,
                exit_reason: reason,
                return_pct,
                profit_loss,
                days_held,
            },
        );

        tracing::info!(
            ticker = %position.ticker,
            reason = reason.as_str(),
            %profit_loss,
            %return_pct,
            days_held,
            "Closed position"
        );
    }

    /// Replay historical signals into positions, idempotently
    ///
    /// Signals are applied oldest-first; duplicates and unpriced signals
    /// count as skipped, never as errors.
    pub fn backfill(&mut self, signals: &[Signal], prices: &dyn PriceSource) -> BackfillStats {
        let mut ordered: Vec<&Signal> = signals.iter().collect();
        ordered.sort_by_key(|s| s.created_at);

        let mut stats = BackfillStats::default();
        for signal in ordered {
            let entry_date = signal.created_at.date_naive();
            let entry_price = prices
                .price(&signal.ticker, entry_date)
                .or(signal.price_at_signal);
            let Some(entry_price) = entry_price else {
                tracing::warn!(ticker = %signal.ticker, %entry_date, "No historical price, skipping");
                stats.skipped += 1;
                continue;
            };

            match self.open_from_signal(signal, entry_date, entry_price) {
                EntryOutcome::Opened => stats.created += 1,
                _ => stats.skipped += 1,
            }
        }

        tracing::info!(
            created = stats.created,
            skipped = stats.skipped,
            "Backfill complete"
        );
        stats
    }

    /// Read-only view of the ledger
    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// All currently open positions
    pub fn open_positions(&self) -> Vec<&Position> {
        self.ledger.open_positions()
    }

    /// Closed positions with exit dates inside the range
    pub fn closed_positions(
        &self,
        range: std::ops::RangeInclusive<NaiveDate>,
    ) -> Vec<&Position> {
        self.ledger.closed_in_range(range)
    }

    /// Performance summary over a date range plus the current open book
    pub fn performance_summary(
        &self,
        range: std::ops::RangeInclusive<NaiveDate>,
        backtest: &crate::config::BacktestConfig,
        benchmark_return_pct: f64,
    ) -> crate::performance::PerformanceSummary {
        let closed = self.ledger.closed_in_range(range);
        let open = self.ledger.open_positions();
        let snapshots = self.ledger.latest_open_snapshots();
        crate::performance::PerformanceAggregator::new(backtest).summarize(
            &closed,
            &open,
            &snapshots,
            benchmark_return_pct,
        )
    }
}
