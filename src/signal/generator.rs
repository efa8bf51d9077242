//! Signal generation logic

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{Signal, TriggerKind};
use crate::config::{SignalConfig, TriggerConfig};
use crate::observation::{InsiderTrade, NewsSentiment, SocialStats};
use crate::velocity::{TechnicalSnapshot, VelocityMetrics};

/// Bonus applied when two or more triggers fire together
const MULTI_TRIGGER_BONUS: f64 = 15.0;
/// Weight of the composite velocity score in the conviction sum
const COMPOSITE_WEIGHT: f64 = 0.3;
/// Weight of the technical score in the conviction sum
const TECHNICAL_WEIGHT: f64 = 0.2;

/// Auxiliary per-ticker context for signal evaluation
///
/// Every field is optional; missing context makes the affected
/// predicates false rather than failing the ticker.
#[derive(Debug, Clone, Default)]
pub struct SignalContext {
    pub insider_trades: Vec<InsiderTrade>,
    pub technical: Option<TechnicalSnapshot>,
    pub news: Option<NewsSentiment>,
    pub social: Option<SocialStats>,
    /// Current price for the signal record
    pub price: Option<Decimal>,
}

/// Velocity metrics plus context for one ticker, in discovery order
#[derive(Debug, Clone)]
pub struct SignalInputs {
    pub metrics: VelocityMetrics,
    pub context: SignalContext,
}

/// Generates ranked trading signals from velocity and context data
pub struct SignalGenerator {
    triggers: TriggerConfig,
    minimum_conviction: f64,
}

impl SignalGenerator {
    /// Create a generator from validated configuration
    pub fn new(triggers: TriggerConfig, signals: SignalConfig) -> Self {
        Self {
            triggers,
            minimum_conviction: signals.minimum_conviction,
        }
    }

    /// Evaluate all tickers and return signals sorted by conviction
    ///
    /// Ties keep the input (discovery) order, so output is fully
    /// deterministic for a given input slice.
    pub fn generate(&self, inputs: &[SignalInputs], as_of: DateTime<Utc>) -> Vec<Signal> {
        let mut signals: Vec<Signal> = inputs
            .iter()
            .filter_map(|input| self.evaluate(input, as_of))
            .collect();

        signals.sort_by(|a, b| {
            b.conviction
                .partial_cmp(&a.conviction)
                .unwrap_or(Ordering::Equal)
        });

        tracing::info!(
            generated = signals.len(),
            evaluated = inputs.len(),
            "Signal generation complete"
        );
        signals
    }

    /// Evaluate one ticker; `None` when no trigger fires or conviction
    /// falls below the emission floor
    fn evaluate(&self, input: &SignalInputs, as_of: DateTime<Utc>) -> Option<Signal> {
        let metrics = &input.metrics;
        let ctx = &input.context;

        let mut triggers = Vec::new();

        if self.check_velocity_spike(metrics) {
            triggers.push(TriggerKind::VelocitySpike);
        }
        if self.check_insider_cluster(&ctx.insider_trades, as_of) {
            triggers.push(TriggerKind::InsiderCluster);
        }
        if self.check_sentiment_flip(metrics) {
            triggers.push(TriggerKind::SentimentFlip);
        }
        if let Some(tech) = &ctx.technical {
            if tech.breakout_detected {
                triggers.push(TriggerKind::TechnicalBreakout);
            }
            if self.check_rsi_oversold(tech) {
                triggers.push(TriggerKind::RsiOversold);
            }
            if tech.golden_cross {
                triggers.push(TriggerKind::GoldenCross);
            }
        }
        if let Some(news) = &ctx.news {
            if self.check_news_bullish(news) {
                triggers.push(TriggerKind::NewsBullish);
            }
        }
        if let Some(social) = &ctx.social {
            if social.mention_count >= self.triggers.social_viral.min_mentions {
                triggers.push(TriggerKind::SocialViral);
            }
        }

        let mut conviction: f64 = triggers.iter().map(|t| t.contribution()).sum();

        if triggers.len() >= 2 {
            conviction += MULTI_TRIGGER_BONUS;
        }
        if let Some(tech) = &ctx.technical {
            conviction += tech.score() * TECHNICAL_WEIGHT;
        }
        conviction += metrics.composite_score * COMPOSITE_WEIGHT;
        conviction = conviction.min(100.0);

        if triggers.is_empty() || conviction < self.minimum_conviction {
            return None;
        }

        let notes = self.build_notes(metrics, ctx, &triggers, as_of);
        Some(Signal::new(
            metrics.ticker.clone(),
            triggers,
            conviction,
            ctx.price,
            as_of,
            notes,
        ))
    }

    fn check_velocity_spike(&self, metrics: &VelocityMetrics) -> bool {
        let t = &self.triggers.velocity_spike;
        metrics.mention_velocity_24h >= t.min_mention_velocity_24h
            && metrics.composite_score >= t.min_composite
    }

    /// Cluster buy: both a minimum event count and a minimum cumulative
    /// dollar value within the lookback window, simultaneously
    fn check_insider_cluster(&self, trades: &[InsiderTrade], as_of: DateTime<Utc>) -> bool {
        if trades.is_empty() {
            return false;
        }
        let t = &self.triggers.insider_cluster;
        let cutoff = as_of.date_naive() - Duration::days(t.lookback_days);

        let recent_buys: Vec<&InsiderTrade> = trades
            .iter()
            .filter(|trade| trade.is_purchase() && trade.trade_date >= cutoff)
            .collect();

        if recent_buys.len() < t.min_events {
            return false;
        }
        let total_value: Decimal = recent_buys.iter().map(|trade| trade.value).sum();
        total_value >= t.min_total_value
    }

    fn check_sentiment_flip(&self, metrics: &VelocityMetrics) -> bool {
        metrics.sentiment_velocity.abs() >= self.triggers.sentiment_flip.min_delta
    }

    fn check_rsi_oversold(&self, tech: &TechnicalSnapshot) -> bool {
        match tech.rsi_14 {
            Some(rsi) => rsi < self.triggers.rsi_oversold.max_rsi,
            None => false,
        }
    }

    fn check_news_bullish(&self, news: &NewsSentiment) -> bool {
        let label = news.label.as_deref().unwrap_or("").to_lowercase();
        news.score > self.triggers.news_bullish.min_score
            || label.contains("bullish")
            || label.contains("positive")
    }

    /// Human-readable summary of what fired
    fn build_notes(
        &self,
        metrics: &VelocityMetrics,
        ctx: &SignalContext,
        triggers: &[TriggerKind],
        as_of: DateTime<Utc>,
    ) -> String {
        let mut notes = Vec::new();
        let cutoff =
            as_of.date_naive() - Duration::days(self.triggers.insider_cluster.lookback_days);

        for trigger in triggers {
            match trigger {
                TriggerKind::VelocitySpike => {
                    notes.push(format!(
                        "Mentions up {:.0}% in 24h",
                        metrics.mention_velocity_24h
                    ));
                }
                TriggerKind::InsiderCluster => {
                    let buys: Vec<&InsiderTrade> = ctx
                        .insider_trades
                        .iter()
                        .filter(|t| t.is_purchase() && t.trade_date >= cutoff)
                        .collect();
                    let total: Decimal = buys.iter().map(|t| t.value).sum();
                    notes.push(format!("{} insiders bought ${} recently", buys.len(), total));
                }
                TriggerKind::SentimentFlip => {
                    let direction = if metrics.sentiment_velocity > 0.0 {
                        "bullish"
                    } else {
                        "bearish"
                    };
                    notes.push(format!("Sentiment flipping {direction}"));
                }
                TriggerKind::TechnicalBreakout => {
                    notes.push("Technical breakout detected".to_string());
                }
                TriggerKind::RsiOversold => {
                    if let Some(rsi) = ctx.technical.as_ref().and_then(|t| t.rsi_14) {
                        notes.push(format!("RSI oversold ({rsi:.1})"));
                    }
                }
                TriggerKind::GoldenCross => {
                    notes.push("Golden cross (SMA)".to_string());
                }
                TriggerKind::NewsBullish => {
                    if let Some(news) = &ctx.news {
                        notes.push(format!("News bullish ({:.2})", news.score));
                    }
                }
                TriggerKind::SocialViral => {
                    if let Some(social) = &ctx.social {
                        notes.push(format!("Social viral ({} mentions)", social.mention_count));
                    }
                }
            }
        }

        notes.push(format!("Composite: {:.0}", metrics.composite_score));
        notes.join(" | ")
    }

    /// Filter signals by a minimum conviction score
    pub fn filter_by_conviction(signals: &[Signal], min_conviction: f64) -> Vec<Signal> {
        signals
            .iter()
            .filter(|s| s.conviction >= min_conviction)
            .cloned()
            .collect()
    }

    /// Top N signals by conviction (input already ranked)
    pub fn top_signals(signals: &[Signal], n: usize) -> Vec<Signal> {
        signals.iter().take(n).cloned().collect()
    }

    /// Group signals by their type label
    pub fn group_by_type(signals: &[Signal]) -> HashMap<&'static str, Vec<Signal>> {
        let mut grouped: HashMap<&'static str, Vec<Signal>> = HashMap::new();
        for signal in signals {
            grouped
                .entry(signal.signal_type())
                .or_default()
                .push(signal.clone());
        }
        grouped
    }
}
