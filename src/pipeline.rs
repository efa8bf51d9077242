//! Scan pipeline
//!
//! One batch per invocation: velocity metrics and signal evaluation per
//! ticker, with per-ticker failure isolation, followed by a single
//! serialized phase that applies entries to the simulator ledger. The
//! pipeline itself performs no network or blocking I/O; observation and
//! price retrieval are injected.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::config::Config;
use crate::observation::{InsiderTrade, NewsSentiment, ObservationSeries, SocialStats};
use crate::signal::{Signal, SignalContext, SignalGenerator, SignalInputs};
use crate::telemetry::{record_latency, set_gauge, GaugeMetric, LatencyMetric};
use crate::velocity::{TechnicalAnalyzer, VelocityEngine, VelocityMetrics};

/// Everything known about one ticker going into a scan
#[derive(Debug, Clone, Default)]
pub struct TickerData {
    pub series: ObservationSeries,
    pub insider_trades: Vec<InsiderTrade>,
    pub news: Option<NewsSentiment>,
    pub social: Option<SocialStats>,
}

/// Supplies per-ticker data to a scan run
///
/// Implemented by the Parquet archive; network collectors live behind
/// the same seam in the orchestration layer.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Ticker data in discovery order
    async fn ticker_data(&self) -> anyhow::Result<Vec<TickerData>>;
}

/// Output of one scan run
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Metrics for every scored ticker
    pub metrics: Vec<VelocityMetrics>,
    /// Ranked signals
    pub signals: Vec<Signal>,
    /// Tickers excluded by the activity filter or bad data
    pub skipped: usize,
}

impl ScanOutcome {
    /// Signals at or above a conviction floor
    pub fn signals_above(&self, min_conviction: f64) -> Vec<&Signal> {
        self.signals
            .iter()
            .filter(|s| s.conviction >= min_conviction)
            .collect()
    }
}

/// Runs the velocity -> signal stages for a batch of tickers
pub struct ScanEngine {
    velocity: VelocityEngine,
    technical: TechnicalAnalyzer,
    generator: SignalGenerator,
}

impl ScanEngine {
    /// Create an engine from validated configuration
    pub fn new(config: &Config) -> Self {
        Self {
            velocity: VelocityEngine::new(
                config.weights.clone(),
                config.scales.clone(),
                config.velocity.clone(),
            ),
            technical: TechnicalAnalyzer::new(),
            generator: SignalGenerator::new(config.triggers.clone(), config.signals.clone()),
        }
    }

    /// Score every ticker and generate ranked signals
    ///
    /// A ticker that cannot be scored is logged and skipped; it never
    /// aborts the rest of the batch.
    pub fn run(&self, tickers: &[TickerData], as_of: DateTime<Utc>) -> ScanOutcome {
        let started = Instant::now();

        let mut metrics = Vec::new();
        let mut inputs = Vec::new();
        let mut skipped = 0usize;

        for data in tickers {
            match self.score_ticker(data, as_of) {
                Some(input) => {
                    metrics.push(input.metrics.clone());
                    inputs.push(input);
                }
                None => skipped += 1,
            }
        }
        record_latency(LatencyMetric::VelocityCalculation, started.elapsed());

        let signal_start = Instant::now();
        let signals = self.generator.generate(&inputs, as_of);
        record_latency(LatencyMetric::SignalGeneration, signal_start.elapsed());

        set_gauge(GaugeMetric::TrackedTickers, metrics.len() as f64);
        set_gauge(GaugeMetric::SignalsGenerated, signals.len() as f64);
        tracing::info!(
            scored = metrics.len(),
            skipped,
            signals = signals.len(),
            "Scan complete"
        );

        ScanOutcome {
            metrics,
            signals,
            skipped,
        }
    }

    /// Velocity metrics plus signal context for one ticker
    fn score_ticker(&self, data: &TickerData, as_of: DateTime<Utc>) -> Option<SignalInputs> {
        let ticker = data.series.ticker();
        if ticker.is_empty() {
            tracing::error!("Ticker with empty symbol, excluding from run");
            return None;
        }

        let latest_mentions = data.series.latest_mentions().unwrap_or(0);
        if latest_mentions < self.velocity.min_mentions() {
            tracing::debug!(ticker, latest_mentions, "Below activity floor, skipping");
            return None;
        }

        let metrics = self.velocity.calculate(&data.series, as_of);
        let technical = self.technical.analyze(ticker, &data.series.closes());

        Some(SignalInputs {
            metrics,
            context: SignalContext {
                insider_trades: data.insider_trades.clone(),
                technical,
                news: data.news.clone(),
                social: data.social.clone(),
                price: data.series.latest_price(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap()
    }

    fn active_ticker(ticker: &str, counts: &[u32]) -> TickerData {
        let observations = counts
            .iter()
            .enumerate()
            .map(|(i, c)| Observation {
                ticker: ticker.to_string(),
                timestamp: as_of() - Duration::days((counts.len() - 1 - i) as i64),
                mentions: Some(*c),
                price: Some(dec!(50)),
                sentiment: Some(0.2),
            })
            .collect();
        TickerData {
            series: ObservationSeries::from_observations(ticker, observations),
            ..Default::default()
        }
    }

    #[test]
    fn test_activity_filter_excludes_quiet_tickers() {
        let engine = ScanEngine::new(&Config::default());

        let quiet = active_ticker("QUIET", &[1, 2, 1]);
        let busy = active_ticker("BUSY", &[20, 40, 400]);

        let outcome = engine.run(&[quiet, busy], as_of());
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.metrics.len(), 1);
        assert_eq!(outcome.metrics[0].ticker, "BUSY");
    }

    #[test]
    fn test_empty_symbol_isolated() {
        let engine = ScanEngine::new(&Config::default());
        let bad = active_ticker("", &[20, 40, 400]);
        let good = active_ticker("GOOD", &[20, 40, 400]);

        let outcome = engine.run(&[bad, good], as_of());
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.metrics.len(), 1);
    }

    #[test]
    fn test_scan_produces_ranked_signals() {
        let engine = ScanEngine::new(&Config::default());
        // A sharp spike in mentions with good composite
        let spiking = active_ticker("SPIKE", &[10, 10, 12, 15, 20, 30, 300]);
        let flat = active_ticker("FLAT", &[10, 10, 10, 10, 10, 10, 10]);

        let outcome = engine.run(&[flat, spiking], as_of());
        assert_eq!(outcome.metrics.len(), 2);
        assert!(outcome.signals.iter().all(|s| s.ticker == "SPIKE"));
        for signal in &outcome.signals {
            assert!((0.0..=100.0).contains(&signal.conviction));
        }
    }

    #[test]
    fn test_signals_above_floor() {
        let mut outcome = ScanOutcome::default();
        outcome.signals.push(Signal::new(
            "AAA",
            vec![crate::signal::TriggerKind::VelocitySpike],
            80.0,
            None,
            as_of(),
            String::new(),
        ));
        outcome.signals.push(Signal::new(
            "BBB",
            vec![crate::signal::TriggerKind::VelocitySpike],
            45.0,
            None,
            as_of(),
            String::new(),
        ));

        assert_eq!(outcome.signals_above(60.0).len(), 1);
    }
}
