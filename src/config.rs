//! Configuration types for pulse-trader

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration validation errors
///
/// All of these are fatal at startup; a run never proceeds with an
/// invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Composite weights must sum to 1
    #[error("composite weights sum to {0}, expected 1.0")]
    WeightsSum(f64),
    /// A value that must be strictly positive is not
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    /// A threshold that must be non-negative is negative
    #[error("{field} must not be negative, got {value}")]
    NegativeThreshold { field: &'static str, value: f64 },
    /// A percentage outside its allowed range
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub weights: WeightsConfig,
    pub scales: ScalesConfig,
    pub velocity: VelocityConfig,
    pub triggers: TriggerConfig,
    pub signals: SignalConfig,
    pub trading: TradingConfig,
    pub backtest: BacktestConfig,
    pub data: DataConfig,
    pub telemetry: TelemetryConfig,
}

/// Component weights for the composite velocity score
///
/// Must sum to 1; validated at load time, never at call time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub mention_24h: f64,
    pub mention_7d: f64,
    pub sentiment: f64,
    pub divergence: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            mention_24h: 0.35,
            mention_7d: 0.25,
            sentiment: 0.25,
            divergence: 0.15,
        }
    }
}

/// Scale tunables for the composite score's logistic transforms
///
/// Empirically chosen; the defaults reproduce the tracker's historical
/// scoring behavior and carry no intrinsic meaning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScalesConfig {
    /// Steepness divisor for the 24h mention velocity component
    pub mention_24h: f64,
    /// Steepness divisor for the 7d trend slope component
    pub mention_7d: f64,
    /// Steepness divisor for the sentiment velocity component
    pub sentiment: f64,
    /// Steepness divisor for the divergence component
    pub divergence: f64,
    /// Input gain applied to sentiment velocity before normalization
    pub sentiment_gain: f64,
    /// Input gain applied to divergence before normalization
    pub divergence_gain: f64,
}

impl Default for ScalesConfig {
    fn default() -> Self {
        Self {
            mention_24h: 100.0,
            mention_7d: 10.0,
            sentiment: 20.0,
            divergence: 25.0,
            sentiment_gain: 100.0,
            divergence_gain: 50.0,
        }
    }
}

/// Velocity engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Minimum latest mention count for a ticker to enter a scan
    pub min_mentions: u32,
    /// Trailing window for the trend slope
    pub trend_window_days: i64,
    /// Moving-average window for sentiment velocity smoothing
    pub sentiment_smoothing_window: usize,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            min_mentions: 5,
            trend_window_days: 7,
            sentiment_smoothing_window: 6,
        }
    }
}

/// Per-trigger thresholds
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub velocity_spike: VelocitySpikeThresholds,
    pub insider_cluster: InsiderClusterThresholds,
    pub sentiment_flip: SentimentFlipThresholds,
    pub rsi_oversold: RsiOversoldThresholds,
    pub news_bullish: NewsBullishThresholds,
    pub social_viral: SocialViralThresholds,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VelocitySpikeThresholds {
    /// Minimum 24h mention velocity percentage
    pub min_mention_velocity_24h: f64,
    /// Minimum composite score
    pub min_composite: f64,
}

impl Default for VelocitySpikeThresholds {
    fn default() -> Self {
        Self {
            min_mention_velocity_24h: 100.0,
            min_composite: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsiderClusterThresholds {
    /// Minimum number of qualifying purchase events
    pub min_events: usize,
    /// Lookback window for qualifying events
    pub lookback_days: i64,
    /// Minimum cumulative dollar value across qualifying events
    pub min_total_value: Decimal,
}

impl Default for InsiderClusterThresholds {
    fn default() -> Self {
        Self {
            min_events: 2,
            lookback_days: 14,
            min_total_value: Decimal::from(100_000),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentFlipThresholds {
    /// Minimum absolute sentiment velocity
    pub min_delta: f64,
}

impl Default for SentimentFlipThresholds {
    fn default() -> Self {
        Self { min_delta: 0.3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RsiOversoldThresholds {
    /// RSI below this reads as oversold
    pub max_rsi: f64,
}

impl Default for RsiOversoldThresholds {
    fn default() -> Self {
        Self { max_rsi: 30.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsBullishThresholds {
    /// Minimum news sentiment score
    pub min_score: f64,
}

impl Default for NewsBullishThresholds {
    fn default() -> Self {
        Self { min_score: 0.15 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocialViralThresholds {
    /// Minimum social mention count
    pub min_mentions: u32,
}

impl Default for SocialViralThresholds {
    fn default() -> Self {
        Self { min_mentions: 10 }
    }
}

/// Signal emission configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Minimum conviction for a signal to be emitted at all
    pub minimum_conviction: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            minimum_conviction: 40.0,
        }
    }
}

/// Trade simulator configuration (paper trading and backtesting share it)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Minimum conviction to open a position
    pub min_conviction: f64,
    /// Base position size in dollars (at conviction 50)
    pub base_position_size: Decimal,
    /// Maximum concurrently open positions
    pub max_open_positions: usize,
    /// Maximum holding period in days
    pub hold_days: i64,
    /// Stop-loss as a percentage of entry price (negative)
    pub stop_loss_pct: Decimal,
    /// Take-profit as a percentage of entry price (positive)
    pub take_profit_pct: Decimal,
    /// Lookback window for idempotent signal backfill
    pub backfill_days: i64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            min_conviction: 60.0,
            base_position_size: Decimal::from(1000),
            max_open_positions: 10,
            hold_days: 30,
            stop_loss_pct: Decimal::from(-10),
            take_profit_pct: Decimal::from(20),
            backfill_days: 30,
        }
    }
}

/// Backtest and performance configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Starting capital for the equity curve
    pub initial_capital: Decimal,
    /// Annualization factor for the Sharpe-like ratio
    pub periods_per_year: f64,
    /// Annual risk-free rate
    pub risk_free_rate: f64,
    /// Ticker used for the buy-and-hold benchmark
    pub benchmark_ticker: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(10_000),
            periods_per_year: 252.0,
            risk_free_rate: 0.02,
            benchmark_ticker: "SPY".to_string(),
        }
    }
}

/// Data archive configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub archive_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            archive_dir: PathBuf::from("./data"),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (field, value) in [
            ("weights.mention_24h", w.mention_24h),
            ("weights.mention_7d", w.mention_7d),
            ("weights.sentiment", w.sentiment),
            ("weights.divergence", w.divergence),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeThreshold { field, value });
            }
        }
        let sum = w.mention_24h + w.mention_7d + w.sentiment + w.divergence;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightsSum(sum));
        }

        let s = &self.scales;
        for (field, value) in [
            ("scales.mention_24h", s.mention_24h),
            ("scales.mention_7d", s.mention_7d),
            ("scales.sentiment", s.sentiment),
            ("scales.divergence", s.divergence),
            ("scales.sentiment_gain", s.sentiment_gain),
            ("scales.divergence_gain", s.divergence_gain),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        let t = &self.triggers;
        if t.velocity_spike.min_mention_velocity_24h < 0.0 {
            return Err(ConfigError::NegativeThreshold {
                field: "triggers.velocity_spike.min_mention_velocity_24h",
                value: t.velocity_spike.min_mention_velocity_24h,
            });
        }
        if !(0.0..=100.0).contains(&t.velocity_spike.min_composite) {
            return Err(ConfigError::OutOfRange {
                field: "triggers.velocity_spike.min_composite",
                value: t.velocity_spike.min_composite,
            });
        }
        if t.insider_cluster.lookback_days <= 0 {
            return Err(ConfigError::NonPositive {
                field: "triggers.insider_cluster.lookback_days",
                value: t.insider_cluster.lookback_days as f64,
            });
        }
        if t.insider_cluster.min_total_value < Decimal::ZERO {
            return Err(ConfigError::NegativeThreshold {
                field: "triggers.insider_cluster.min_total_value",
                value: decimal_to_f64(t.insider_cluster.min_total_value),
            });
        }
        if t.sentiment_flip.min_delta < 0.0 {
            return Err(ConfigError::NegativeThreshold {
                field: "triggers.sentiment_flip.min_delta",
                value: t.sentiment_flip.min_delta,
            });
        }
        if !(0.0..=100.0).contains(&t.rsi_oversold.max_rsi) {
            return Err(ConfigError::OutOfRange {
                field: "triggers.rsi_oversold.max_rsi",
                value: t.rsi_oversold.max_rsi,
            });
        }

        if !(0.0..=100.0).contains(&self.signals.minimum_conviction) {
            return Err(ConfigError::OutOfRange {
                field: "signals.minimum_conviction",
                value: self.signals.minimum_conviction,
            });
        }

        let tr = &self.trading;
        if !(0.0..=100.0).contains(&tr.min_conviction) {
            return Err(ConfigError::OutOfRange {
                field: "trading.min_conviction",
                value: tr.min_conviction,
            });
        }
        if tr.base_position_size <= Decimal::ZERO {
            return Err(ConfigError::NonPositive {
                field: "trading.base_position_size",
                value: decimal_to_f64(tr.base_position_size),
            });
        }
        if tr.max_open_positions == 0 {
            return Err(ConfigError::NonPositive {
                field: "trading.max_open_positions",
                value: 0.0,
            });
        }
        if tr.hold_days <= 0 {
            return Err(ConfigError::NonPositive {
                field: "trading.hold_days",
                value: tr.hold_days as f64,
            });
        }
        if tr.stop_loss_pct >= Decimal::ZERO || tr.stop_loss_pct <= Decimal::from(-100) {
            return Err(ConfigError::OutOfRange {
                field: "trading.stop_loss_pct",
                value: decimal_to_f64(tr.stop_loss_pct),
            });
        }
        if tr.take_profit_pct <= Decimal::ZERO {
            return Err(ConfigError::NonPositive {
                field: "trading.take_profit_pct",
                value: decimal_to_f64(tr.take_profit_pct),
            });
        }
        if tr.backfill_days <= 0 {
            return Err(ConfigError::NonPositive {
                field: "trading.backfill_days",
                value: tr.backfill_days as f64,
            });
        }

        let b = &self.backtest;
        if b.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::NonPositive {
                field: "backtest.initial_capital",
                value: decimal_to_f64(b.initial_capital),
            });
        }
        if b.periods_per_year <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "backtest.periods_per_year",
                value: b.periods_per_year,
            });
        }

        Ok(())
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    f64::try_from(value).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [weights]
            mention_24h = 0.4
            mention_7d = 0.2
            sentiment = 0.25
            divergence = 0.15

            [signals]
            minimum_conviction = 45

            [trading]
            min_conviction = 65
            base_position_size = 2000
            max_open_positions = 5
            hold_days = 20
            stop_loss_pct = -8
            take_profit_pct = 25
            backfill_days = 14

            [telemetry]
            metrics_port = 9091
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.weights.mention_24h, 0.4);
        assert_eq!(config.signals.minimum_conviction, 45.0);
        assert_eq!(config.trading.base_position_size, dec!(2000));
        assert_eq!(config.trading.max_open_positions, 5);
        assert_eq!(config.telemetry.metrics_port, 9091);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let toml = r#"
            [trading]
            hold_days = 10
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.trading.hold_days, 10);
        assert_eq!(config.trading.min_conviction, 60.0);
        assert_eq!(config.weights.mention_24h, 0.35);
        assert_eq!(config.triggers.insider_cluster.min_events, 2);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut config = Config::default();
        config.weights.mention_24h = 0.5;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::WeightsSum(_)));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = Config::default();
        config.weights.mention_24h = -0.1;
        config.weights.mention_7d = 0.7;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::NegativeThreshold { .. }));
    }

    #[test]
    fn test_non_positive_hold_days_rejected() {
        let mut config = Config::default();
        config.trading.hold_days = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonPositive {
                field: "trading.hold_days",
                ..
            }
        ));
    }

    #[test]
    fn test_positive_stop_loss_rejected() {
        let mut config = Config::default();
        config.trading.stop_loss_pct = dec!(10);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_negative_trigger_threshold_rejected() {
        let mut config = Config::default();
        config.triggers.sentiment_flip.min_delta = -0.1;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut config = Config::default();
        config.scales.mention_24h = 0.0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { .. }));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_weights_fatal_at_load() {
        let toml = r#"
            [weights]
            mention_24h = 0.9
            mention_7d = 0.9
            sentiment = 0.25
            divergence = 0.15
        "#;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, toml).unwrap();

        let result = Config::load(&path);
        assert!(result.is_err());
    }
}
