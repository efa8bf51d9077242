//! Velocity metrics module
//!
//! Converts raw per-ticker observation series into bounded velocity and
//! composite momentum metrics, plus technical indicators derived from
//! price history.

mod engine;
pub mod technical;

pub use engine::{
    composite_score, divergence, mention_velocity_pct, sentiment_velocity, trend_slope,
    VelocityEngine, VelocityMetrics,
};
pub use technical::{TechnicalAnalyzer, TechnicalSnapshot};
