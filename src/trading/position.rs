//! Position and snapshot records

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::signal::TriggerKind;

/// Position lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// The condition that closed a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeLimit,
    Manual,
}

impl ExitReason {
    /// Stable string name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TimeLimit => "time_limit",
            ExitReason::Manual => "manual",
        }
    }
}

/// Exit fields, recorded together when a position closes
///
/// Grouping them in one record keeps the invariant that exit data is
/// either fully absent (open) or fully present (closed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRecord {
    pub exit_date: NaiveDate,
    pub exit_price: Decimal,
    pub exit_reason: ExitReason,
    /// Percentage return over the entry price
    pub return_pct: Decimal,
    /// Dollar profit or loss
    pub profit_loss: Decimal,
    pub days_held: i64,
}

/// A simulated position, unique per (ticker, entry date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub entry_price: Decimal,
    pub shares: u64,
    /// Capital actually deployed: shares x entry price
    pub position_size: Decimal,
    /// Conviction of the originating signal
    pub conviction: f64,
    /// Triggers that produced the originating signal
    pub signal_types: Vec<TriggerKind>,
    pub stop_loss_price: Decimal,
    pub target_price: Decimal,
    pub status: PositionStatus,
    pub exit: Option<ExitRecord>,
}

impl Position {
    /// Ledger key for this position
    pub fn key(&self) -> (String, NaiveDate) {
        (self.ticker.clone(), self.entry_date)
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Unrealized dollar P&L at the given price
    pub fn unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        (current_price - self.entry_price) * Decimal::from(self.shares)
    }

    /// Unrealized percentage return at the given price
    pub fn unrealized_pct(&self, current_price: Decimal) -> Decimal {
        (current_price - self.entry_price) / self.entry_price * Decimal::from(100)
    }

    /// Days the position has been held as of a date
    pub fn days_held_at(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }
}

/// Daily mark of an open position; append-only history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub date: NaiveDate,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pct: Decimal,
}

/// In-memory position and snapshot store
///
/// The (ticker, entry_date) key enforces idempotent backfill: a second
/// insert for the same key is rejected, never an error. Iteration order
/// is the key order, which keeps daily evaluation deterministic.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: BTreeMap<(String, NaiveDate), Position>,
    snapshots: Vec<Snapshot>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a position exists for this ticker and entry date
    pub fn contains(&self, ticker: &str, entry_date: NaiveDate) -> bool {
        self.positions
            .contains_key(&(ticker.to_string(), entry_date))
    }

    /// Insert a new position; returns false on a duplicate key
    pub fn insert(&mut self, position: Position) -> bool {
        let key = position.key();
        if self.positions.contains_key(&key) {
            return false;
        }
        self.positions.insert(key, position);
        true
    }

    /// Keys of all open positions, in deterministic order
    pub fn open_keys(&self) -> Vec<(String, NaiveDate)> {
        self.positions
            .values()
            .filter(|p| p.is_open())
            .map(|p| p.key())
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.positions.values().filter(|p| p.is_open()).count()
    }

    pub fn get(&self, ticker: &str, entry_date: NaiveDate) -> Option<&Position> {
        self.positions.get(&(ticker.to_string(), entry_date))
    }

    /// All open positions
    pub fn open_positions(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| p.is_open()).collect()
    }

    /// All closed positions
    pub fn closed_positions(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| !p.is_open()).collect()
    }

    /// Closed positions whose exit date falls in the range
    pub fn closed_in_range(&self, range: RangeInclusive<NaiveDate>) -> Vec<&Position> {
        self.positions
            .values()
            .filter(|p| {
                p.exit
                    .as_ref()
                    .is_some_and(|e| range.contains(&e.exit_date))
            })
            .collect()
    }

    /// Record a daily snapshot, replacing any mark already taken for the
    /// same position and date
    pub fn record_snapshot(&mut self, snapshot: Snapshot) {
        if let Some(existing) = self.snapshots.iter_mut().find(|s| {
            s.ticker == snapshot.ticker
                && s.entry_date == snapshot.entry_date
                && s.date == snapshot.date
        }) {
            *existing = snapshot;
        } else {
            self.snapshots.push(snapshot);
        }
    }

    /// Snapshot history for one position
    pub fn snapshots_for(&self, ticker: &str, entry_date: NaiveDate) -> Vec<&Snapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.ticker == ticker && s.entry_date == entry_date)
            .collect()
    }

    /// Latest snapshot per open position
    pub fn latest_open_snapshots(&self) -> Vec<&Snapshot> {
        self.open_positions()
            .into_iter()
            .filter_map(|p| {
                self.snapshots
                    .iter()
                    .filter(|s| s.ticker == p.ticker && s.entry_date == p.entry_date)
                    .max_by_key(|s| s.date)
            })
            .collect()
    }

    /// Transition a position to closed in one ledger mutation
    ///
    /// The exit record is attached and the status flipped together, so a
    /// reader never sees a half-closed position.
    pub fn close(
        &mut self,
        ticker: &str,
        entry_date: NaiveDate,
        exit: ExitRecord,
    ) -> Option<&Position> {
        let position = self
            .positions
            .get_mut(&(ticker.to_string(), entry_date))?;
        if !position.is_open() {
            return None;
        }
        position.exit = Some(exit);
        position.status = PositionStatus::Closed;
        Some(position)
    }

    pub fn total_positions(&self) -> usize {
        self.positions.len()
    }
}
