//! Technical indicators from price history
//!
//! RSI, moving averages, Bollinger bands, momentum, and breakout
//! detection, computed from collected closes without extra API calls.

use serde::{Deserialize, Serialize};

/// Minimum closes required before any analysis is attempted
const MIN_CLOSES: usize = 5;

/// Relative Strength Index over the given period
///
/// Below 30 reads oversold, above 70 overbought. Returns `None` with
/// fewer than `period + 1` closes.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &deltas[deltas.len() - period..];

    let avg_gain: f64 = recent.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let avg_loss: f64 = recent.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Simple moving average over the trailing period
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period || period == 0 {
        return None;
    }
    let recent = &prices[prices.len() - period..];
    Some(recent.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average seeded from the first close
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period {
        return None;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut value = prices[0];
    for price in &prices[1..] {
        value = price * multiplier + value * (1.0 - multiplier);
    }
    Some(value)
}

/// Bollinger bands over the trailing period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// Position of the current close within the bands, 0 = lower, 1 = upper
    pub position: f64,
    pub width: f64,
}

/// Compute Bollinger bands; `None` with insufficient data
pub fn bollinger_bands(prices: &[f64], period: usize, std_devs: f64) -> Option<BollingerBands> {
    if prices.len() < period || period == 0 {
        return None;
    }

    let recent = &prices[prices.len() - period..];
    let middle = recent.iter().sum::<f64>() / period as f64;
    let variance = recent.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let std = variance.sqrt();

    let upper = middle + std_devs * std;
    let lower = middle - std_devs * std;
    let current = prices[prices.len() - 1];

    let position = if upper != lower {
        (current - lower) / (upper - lower)
    } else {
        0.5
    };

    Some(BollingerBands {
        upper,
        middle,
        lower,
        position,
        width: upper - lower,
    })
}

/// Percentage price change over the trailing period
pub fn momentum(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period + 1 {
        return None;
    }
    let old = prices[prices.len() - period - 1];
    let current = prices[prices.len() - 1];
    if old == 0.0 {
        return None;
    }
    Some((current - old) / old * 100.0)
}

/// Breakout above the prior range: close at least `threshold` times the
/// previous `period`-day high (current close excluded from the range)
pub fn breakout(prices: &[f64], period: usize, threshold: f64) -> bool {
    if prices.len() < period + 1 {
        return false;
    }
    let range = &prices[prices.len() - period - 1..prices.len() - 1];
    let recent_high = range.iter().cloned().fold(f64::MIN, f64::max);
    let current = prices[prices.len() - 1];
    current >= recent_high * threshold
}

/// SMA-50 crossing above SMA-200 on the latest close
pub fn golden_cross(prices: &[f64]) -> bool {
    if prices.len() < 201 {
        return false;
    }

    let current = prices;
    let prev = &prices[..prices.len() - 1];

    match (sma(current, 50), sma(current, 200), sma(prev, 50), sma(prev, 200)) {
        (Some(ma50), Some(ma200), Some(ma50_prev), Some(ma200_prev)) => {
            ma50_prev <= ma200_prev && ma50 > ma200
        }
        _ => false,
    }
}

/// Point-in-time technical read on one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub ticker: String,
    pub current_price: f64,
    pub rsi_14: Option<f64>,
    pub momentum_10d: Option<f64>,
    pub ma_20: Option<f64>,
    pub ma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub bollinger: Option<BollingerBands>,
    pub breakout_detected: bool,
    pub golden_cross: bool,
}

impl TechnicalSnapshot {
    /// Composite technical score on a 0-100 scale, neutral baseline 50
    pub fn score(&self) -> f64 {
        let mut score: f64 = 50.0;

        if let Some(rsi) = self.rsi_14 {
            if rsi < 30.0 {
                score += 15.0; // oversold reads bullish
            } else if rsi > 70.0 {
                score -= 15.0;
            } else if (40.0..=60.0).contains(&rsi) {
                score += 5.0;
            }
        }

        if let Some(momentum) = self.momentum_10d {
            if momentum > 10.0 {
                score += 20.0;
            } else if momentum > 5.0 {
                score += 10.0;
            } else if momentum < -10.0 {
                score -= 20.0;
            } else if momentum < -5.0 {
                score -= 10.0;
            }
        }

        if let Some(bb) = &self.bollinger {
            if bb.position < 0.2 {
                score += 10.0;
            } else if bb.position > 0.8 {
                score -= 10.0;
            }
        }

        if self.breakout_detected {
            score += 15.0;
        }

        score.clamp(0.0, 100.0)
    }
}

/// Produces technical snapshots from close-price series
#[derive(Debug, Clone, Default)]
pub struct TechnicalAnalyzer;

impl TechnicalAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a close series; `None` with fewer than 5 usable closes
    pub fn analyze(&self, ticker: &str, closes: &[f64]) -> Option<TechnicalSnapshot> {
        if closes.len() < MIN_CLOSES {
            tracing::debug!(ticker, count = closes.len(), "Insufficient price data");
            return None;
        }

        Some(TechnicalSnapshot {
            ticker: ticker.to_string(),
            current_price: closes[closes.len() - 1],
            rsi_14: rsi(closes, 14),
            momentum_10d: momentum(closes, 10),
            ma_20: sma(closes, 20),
            ma_50: sma(closes, 50),
            ema_12: ema(closes, 12),
            bollinger: bollinger_bands(closes, 20, 2.0),
            breakout_detected: breakout(closes, 20, 1.02),
            golden_cross: golden_cross(closes),
        })
    }
}
