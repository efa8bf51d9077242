//! Price source abstraction
//!
//! The simulator never fetches prices itself. Live paper trading hands
//! it the latest poll results; backtesting hands it a deterministic
//! historical table. Entry, sizing, and exit logic are identical either
//! way.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Per-date price lookup for the simulator
pub trait PriceSource {
    /// Price for a ticker on a date, if one is known
    fn price(&self, ticker: &str, date: NaiveDate) -> Option<Decimal>;
}

/// Prices from a single live poll, valid for one date
#[derive(Debug, Clone)]
pub struct LivePriceTable {
    date: NaiveDate,
    prices: HashMap<String, Decimal>,
}

impl LivePriceTable {
    /// Create a table for the poll date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            prices: HashMap::new(),
        }
    }

    /// Record a polled price
    pub fn set(&mut self, ticker: impl Into<String>, price: Decimal) {
        self.prices.insert(ticker.into(), price);
    }

    /// Build from a full poll result
    pub fn from_prices(date: NaiveDate, prices: HashMap<String, Decimal>) -> Self {
        Self { date, prices }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl PriceSource for LivePriceTable {
    fn price(&self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        if date != self.date {
            return None;
        }
        self.prices.get(ticker).copied()
    }
}

/// Deterministic historical price table for backtest replay
#[derive(Debug, Clone, Default)]
pub struct ReplayPriceSource {
    series: HashMap<String, BTreeMap<NaiveDate, Decimal>>,
}

impl ReplayPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one historical price
    pub fn insert(&mut self, ticker: impl Into<String>, date: NaiveDate, price: Decimal) {
        self.series
            .entry(ticker.into())
            .or_default()
            .insert(date, price);
    }

    /// Record a whole daily series for one ticker
    pub fn insert_series(
        &mut self,
        ticker: impl Into<String>,
        prices: impl IntoIterator<Item = (NaiveDate, Decimal)>,
    ) {
        let entry = self.series.entry(ticker.into()).or_default();
        for (date, price) in prices {
            entry.insert(date, price);
        }
    }

    /// Nearest price on or after the date, within a tolerance window
    ///
    /// Daily collection leaves gaps (weekends, missed polls); benchmark
    /// endpoints tolerate a few days of drift.
    pub fn nearest_on_or_after(
        &self,
        ticker: &str,
        date: NaiveDate,
        tolerance_days: i64,
    ) -> Option<Decimal> {
        let series = self.series.get(ticker)?;
        let limit = date + Duration::days(tolerance_days);
        series
            .range(date..=limit)
            .next()
            .map(|(_, price)| *price)
    }

    /// Tickers with at least one recorded price
    pub fn tickers(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }
}

impl PriceSource for ReplayPriceSource {
    fn price(&self, ticker: &str, date: NaiveDate) -> Option<Decimal> {
        self.series.get(ticker)?.get(&date).copied()
    }
}
