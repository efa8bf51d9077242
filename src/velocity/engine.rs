//! Velocity metric calculations
//!
//! Mention velocity, sentiment velocity, divergence, and the weighted
//! composite score. Everything here is a pure function of its inputs;
//! the calculation time is always passed in, never read from a clock,
//! so a run can be recomputed byte-for-byte.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ScalesConfig, VelocityConfig, WeightsConfig};
use crate::observation::ObservationSeries;

/// Epsilon added to standard deviations before normalizing
const STD_EPSILON: f64 = 0.001;

/// Percentage change in mention counts between two periods
///
/// A zero previous count saturates: 0 when both are zero, 100 when the
/// count appeared from nothing. The cap stands in for infinite growth.
pub fn mention_velocity_pct(current: u32, previous: u32) -> f64 {
    if previous == 0 {
        if current == 0 {
            0.0
        } else {
            100.0
        }
    } else {
        (current as f64 - previous as f64) / previous as f64 * 100.0
    }
}

/// Least-squares slope of mention counts within the trailing window
///
/// Positive means accelerating attention, negative means decelerating.
/// Returns 0 when fewer than two points fall inside the window.
pub fn trend_slope(
    history: &[(DateTime<Utc>, u32)],
    window_days: i64,
    as_of: DateTime<Utc>,
) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }

    let cutoff = as_of - Duration::days(window_days);
    let recent: Vec<f64> = history
        .iter()
        .filter(|(ts, _)| *ts >= cutoff)
        .map(|(_, count)| *count as f64)
        .collect();

    if recent.len() < 2 {
        return 0.0;
    }

    let n = recent.len() as f64;
    let sum_x: f64 = (0..recent.len()).map(|i| i as f64).sum();
    let sum_y: f64 = recent.iter().sum();
    let sum_xy: f64 = recent.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..recent.len()).map(|i| (i as f64).powi(2)).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

/// Rate of change in sentiment scores, smoothed by a trailing moving average
///
/// Uses a central-difference gradient (one-sided at the endpoints). When
/// the gradient is shorter than the smoothing window the plain gradient
/// mean is returned instead.
pub fn sentiment_velocity(scores: &[f64], window: usize) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }

    let velocity = gradient(scores);

    if window == 0 || velocity.len() < window {
        return mean(&velocity);
    }

    // Last element of the valid-mode moving-average convolution
    mean(&velocity[velocity.len() - window..])
}

/// Normalized gap between mention momentum and price momentum
///
/// Positive: mentions outpacing price (potential breakout). Negative:
/// price outpacing mentions (potential reversal). Mismatched or empty
/// series yield 0.
pub fn divergence(mention_changes: &[f64], price_changes: &[f64]) -> f64 {
    if mention_changes.len() != price_changes.len() || mention_changes.is_empty() {
        return 0.0;
    }

    let mention_std = std_dev(mention_changes);
    let price_std = std_dev(price_changes);

    let diffs: Vec<f64> = mention_changes
        .iter()
        .zip(price_changes)
        .map(|(m, p)| m / (mention_std + STD_EPSILON) - p / (price_std + STD_EPSILON))
        .collect();

    mean(&diffs)
}

/// Weighted composite velocity score on a 0-100 scale
///
/// Each component passes through a logistic transform so outliers
/// saturate instead of dominating, then the configured weights combine
/// them. Weights are validated to sum to 1 at configuration time.
pub fn composite_score(
    mention_vel_24h: f64,
    mention_vel_7d: f64,
    sentiment_vel: f64,
    divergence: f64,
    weights: &WeightsConfig,
    scales: &ScalesConfig,
) -> f64 {
    let score = weights.mention_24h * normalize(mention_vel_24h, scales.mention_24h)
        + weights.mention_7d * normalize(mention_vel_7d, scales.mention_7d)
        + weights.sentiment * normalize(sentiment_vel * scales.sentiment_gain, scales.sentiment)
        + weights.divergence * normalize(divergence * scales.divergence_gain, scales.divergence);

    score.clamp(0.0, 100.0)
}

/// Logistic normalization to a 0-100 scale, clamped against exp overflow
fn normalize(x: f64, scale: f64) -> f64 {
    let z = (x / scale).clamp(-500.0, 500.0);
    100.0 / (1.0 + (-z).exp())
}

/// Central-difference gradient with one-sided endpoints
fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut grad = Vec::with_capacity(n);
    grad.push(values[1] - values[0]);
    for i in 1..n - 1 {
        grad.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    grad.push(values[n - 1] - values[n - 2]);
    grad
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Velocity metrics for one ticker at one calculation time
///
/// Derived data: recomputed each run and superseded, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityMetrics {
    pub ticker: String,
    /// 24-hour mention velocity percentage
    pub mention_velocity_24h: f64,
    /// Trailing-window trend slope of mention counts
    pub mention_velocity_7d: f64,
    /// Smoothed sentiment rate of change
    pub sentiment_velocity: f64,
    /// Mention-vs-price divergence
    pub divergence: f64,
    /// Composite score in [0, 100]
    pub composite_score: f64,
    /// Calculation timestamp
    pub calculated_at: DateTime<Utc>,
}

/// Calculates all velocity metrics for a ticker from its observation series
#[derive(Debug, Clone)]
pub struct VelocityEngine {
    weights: WeightsConfig,
    scales: ScalesConfig,
    config: VelocityConfig,
}

impl VelocityEngine {
    /// Create an engine from validated configuration
    pub fn new(weights: WeightsConfig, scales: ScalesConfig, config: VelocityConfig) -> Self {
        Self {
            weights,
            scales,
            config,
        }
    }

    /// Minimum latest mention count for a ticker to be worth scoring
    pub fn min_mentions(&self) -> u32 {
        self.config.min_mentions
    }

    /// Calculate metrics for one ticker as of the given time
    ///
    /// Missing or short histories produce neutral component values; a
    /// ticker with partial data still gets a valid, conservative score.
    pub fn calculate(&self, series: &ObservationSeries, as_of: DateTime<Utc>) -> VelocityMetrics {
        let mention_history = series.mention_history();

        let vel_24h = self.velocity_24h(&mention_history, as_of);
        let vel_7d = trend_slope(&mention_history, self.config.trend_window_days, as_of);

        let sentiment_scores = series.sentiment_history();
        let window = self
            .config
            .sentiment_smoothing_window
            .min(sentiment_scores.len());
        let sent_vel = sentiment_velocity(&sentiment_scores, window);

        let div = self.divergence_from_series(series, &mention_history);

        let composite = composite_score(
            vel_24h,
            vel_7d,
            sent_vel,
            div,
            &self.weights,
            &self.scales,
        );

        VelocityMetrics {
            ticker: series.ticker().to_string(),
            mention_velocity_24h: vel_24h,
            mention_velocity_7d: vel_7d,
            sentiment_velocity: sent_vel,
            divergence: div,
            composite_score: composite,
            calculated_at: as_of,
        }
    }

    /// Latest mention count against the last count from at least 24h ago
    fn velocity_24h(&self, history: &[(DateTime<Utc>, u32)], as_of: DateTime<Utc>) -> f64 {
        if history.len() < 2 {
            return 0.0;
        }
        let current = history[history.len() - 1].1;
        let day_ago = as_of - Duration::hours(24);
        let previous = history
            .iter()
            .rev()
            .find(|(ts, _)| *ts <= day_ago)
            .map(|(_, count)| *count);

        match previous {
            Some(prev) => mention_velocity_pct(current, prev),
            None => 0.0,
        }
    }

    /// Pairwise change series for mentions and prices, aligned to equal length
    fn divergence_from_series(
        &self,
        series: &ObservationSeries,
        mention_history: &[(DateTime<Utc>, u32)],
    ) -> f64 {
        let mention_changes: Vec<f64> = mention_history
            .windows(2)
            .map(|w| mention_velocity_pct(w[1].1, w[0].1))
            .collect();

        let price_history = series.price_history();
        let mut price_changes = Vec::new();
        for w in price_history.windows(2) {
            let prev = f64::try_from(w[0].1).unwrap_or(0.0);
            let curr = f64::try_from(w[1].1).unwrap_or(0.0);
            if prev > 0.0 {
                price_changes.push((curr - prev) / prev * 100.0);
            }
        }

        let min_len = mention_changes.len().min(price_changes.len());
        if min_len == 0 {
            return 0.0;
        }
        divergence(&mention_changes[..min_len], &price_changes[..min_len])
    }
}
