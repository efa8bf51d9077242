//! Signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A condition that can fire for a ticker during signal evaluation
///
/// Predicates are independent; they interact only through the summed
/// conviction score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// 24h mention velocity spike with a strong composite score
    VelocitySpike,
    /// Clustered insider/legislator buying
    InsiderCluster,
    /// Sharp shift in sentiment velocity
    SentimentFlip,
    /// Price breakout above the recent range
    TechnicalBreakout,
    /// RSI in oversold territory
    RsiOversold,
    /// SMA-50 crossing above SMA-200
    GoldenCross,
    /// Bullish news sentiment
    NewsBullish,
    /// Viral social mention activity
    SocialViral,
}

impl TriggerKind {
    /// Fixed conviction contribution when this trigger fires
    pub fn contribution(&self) -> f64 {
        match self {
            TriggerKind::VelocitySpike => 30.0,
            TriggerKind::InsiderCluster => 40.0,
            TriggerKind::SentimentFlip => 20.0,
            TriggerKind::TechnicalBreakout => 25.0,
            TriggerKind::RsiOversold => 15.0,
            TriggerKind::GoldenCross => 20.0,
            TriggerKind::NewsBullish => 15.0,
            TriggerKind::SocialViral => 10.0,
        }
    }

    /// Stable string name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::VelocitySpike => "velocity_spike",
            TriggerKind::InsiderCluster => "insider_cluster",
            TriggerKind::SentimentFlip => "sentiment_flip",
            TriggerKind::TechnicalBreakout => "technical_breakout",
            TriggerKind::RsiOversold => "rsi_oversold",
            TriggerKind::GoldenCross => "golden_cross",
            TriggerKind::NewsBullish => "news_bullish",
            TriggerKind::SocialViral => "social_viral",
        }
    }
}

/// A scored trading signal for one ticker
///
/// Immutable once created; one logical signal per ticker per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal identifier
    pub id: Uuid,
    /// Stock ticker symbol
    pub ticker: String,
    /// Triggers that fired, in evaluation order
    pub triggers: Vec<TriggerKind>,
    /// Conviction score in [0, 100]
    pub conviction: f64,
    /// Price when the signal was generated, when known
    pub price_at_signal: Option<Decimal>,
    /// Signal creation timestamp
    pub created_at: DateTime<Utc>,
    /// Human-readable trigger summary
    pub notes: String,
}

impl Signal {
    /// Create a new signal
    pub fn new(
        ticker: impl Into<String>,
        triggers: Vec<TriggerKind>,
        conviction: f64,
        price_at_signal: Option<Decimal>,
        created_at: DateTime<Utc>,
        notes: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.into(),
            triggers,
            conviction,
            price_at_signal,
            created_at,
            notes,
        }
    }

    /// Signal type label: the single trigger's name, or "combined"
    pub fn signal_type(&self) -> &'static str {
        match self.triggers.as_slice() {
            [single] => single.as_str(),
            _ => "combined",
        }
    }
}
