//! Data archive module
//!
//! Stores observations, emitted signals, and closed trades as Parquet
//! files. The archive doubles as the market-data provider for scans and
//! backtests run from the CLI.

mod parquet;

pub use parquet::{observation_schema, signal_schema, trade_schema, ParquetArchive};

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::observation::{Observation, ObservationSeries};
use crate::pipeline::{MarketDataProvider, TickerData};

#[async_trait]
impl MarketDataProvider for ParquetArchive {
    async fn ticker_data(&self) -> anyhow::Result<Vec<TickerData>> {
        let observations = self.read_all_observations()?;
        Ok(group_by_ticker(observations))
    }
}

/// Group a flat observation list into per-ticker series
///
/// Ticker order is alphabetical, which fixes discovery order across
/// runs regardless of file layout.
pub fn group_by_ticker(observations: Vec<Observation>) -> Vec<TickerData> {
    let mut grouped: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        grouped.entry(obs.ticker.clone()).or_default().push(obs);
    }

    grouped
        .into_iter()
        .map(|(ticker, observations)| TickerData {
            series: ObservationSeries::from_observations(ticker, observations),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_group_by_ticker_deterministic_order() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let obs = |ticker: &str| Observation {
            ticker: ticker.to_string(),
            timestamp: ts,
            mentions: Some(5),
            price: Some(dec!(10)),
            sentiment: None,
        };

        let grouped = group_by_ticker(vec![obs("ZZZ"), obs("AAA"), obs("MMM"), obs("AAA")]);
        let tickers: Vec<&str> = grouped.iter().map(|t| t.series.ticker()).collect();
        assert_eq!(tickers, vec!["AAA", "MMM", "ZZZ"]);
        assert_eq!(grouped[0].series.len(), 2);
    }
}
