//! Raw per-ticker observation types
//!
//! Observations arrive from external collectors and are immutable once
//! recorded. Any field may be absent; downstream metrics treat missing
//! data as neutral rather than erroring.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single point-in-time observation for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Stock ticker symbol
    pub ticker: String,
    /// Collection timestamp
    pub timestamp: DateTime<Utc>,
    /// Social mention count, when the mention collector reported
    pub mentions: Option<u32>,
    /// Last traded price, when the price collector reported
    pub price: Option<Decimal>,
    /// Sentiment score in [-1, 1], when available
    pub sentiment: Option<f64>,
}

/// Ordered observation history for one ticker
#[derive(Debug, Clone, Default)]
pub struct ObservationSeries {
    ticker: String,
    observations: Vec<Observation>,
}

impl ObservationSeries {
    /// Create an empty series for a ticker
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            observations: Vec::new(),
        }
    }

    /// Build a series from observations, sorting by timestamp
    pub fn from_observations(ticker: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self {
            ticker: ticker.into(),
            observations,
        }
    }

    /// Append an observation, keeping timestamp order
    pub fn push(&mut self, observation: Observation) {
        match self.observations.last() {
            Some(last) if last.timestamp > observation.timestamp => {
                let idx = self
                    .observations
                    .partition_point(|o| o.timestamp <= observation.timestamp);
                self.observations.insert(idx, observation);
            }
            _ => self.observations.push(observation),
        }
    }

    /// Ticker this series belongs to
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// All observations in timestamp order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// True when the series holds no observations
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Mention counts with timestamps, skipping observations without mentions
    pub fn mention_history(&self) -> Vec<(DateTime<Utc>, u32)> {
        self.observations
            .iter()
            .filter_map(|o| o.mentions.map(|m| (o.timestamp, m)))
            .collect()
    }

    /// Sentiment scores in chronological order
    pub fn sentiment_history(&self) -> Vec<f64> {
        self.observations.iter().filter_map(|o| o.sentiment).collect()
    }

    /// Prices with timestamps, skipping observations without a price
    pub fn price_history(&self) -> Vec<(DateTime<Utc>, Decimal)> {
        self.observations
            .iter()
            .filter_map(|o| o.price.map(|p| (o.timestamp, p)))
            .collect()
    }

    /// Closing prices only, for indicator calculations
    pub fn closes(&self) -> Vec<f64> {
        self.observations
            .iter()
            .filter_map(|o| o.price)
            .filter_map(|p| f64::try_from(p).ok())
            .filter(|p| *p > 0.0)
            .collect()
    }

    /// Most recent mention count, if any observation carried one
    pub fn latest_mentions(&self) -> Option<u32> {
        self.observations.iter().rev().find_map(|o| o.mentions)
    }

    /// Most recent price, if any observation carried one
    pub fn latest_price(&self) -> Option<Decimal> {
        self.observations.iter().rev().find_map(|o| o.price)
    }
}

/// Direction of an insider or legislator trade event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Purchase,
    Sale,
}

/// A reported insider or legislator trade event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsiderTrade {
    /// Stock ticker symbol
    pub ticker: String,
    /// Name of the filer
    pub insider_name: String,
    /// Buy or sell
    pub kind: TradeKind,
    /// Trade date from the filing
    pub trade_date: NaiveDate,
    /// Shares traded
    pub shares: u64,
    /// Price per share
    pub price: Decimal,
    /// Total dollar value of the trade
    pub value: Decimal,
}

impl InsiderTrade {
    /// True for purchase events
    pub fn is_purchase(&self) -> bool {
        self.kind == TradeKind::Purchase
    }
}

/// Aggregated news sentiment for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSentiment {
    /// Sentiment score, roughly [-1, 1]
    pub score: f64,
    /// Provider label such as "bullish" or "somewhat-positive"
    pub label: Option<String>,
}

/// Social activity snapshot for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialStats {
    /// Mention count in the collection window
    pub mention_count: u32,
    /// Average sentiment across mentions, when computed
    pub avg_sentiment: Option<f64>,
}
