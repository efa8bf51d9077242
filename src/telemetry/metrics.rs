//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Velocity metric calculation for a batch
    VelocityCalculation,
    /// Signal generation for a batch
    SignalGeneration,
    /// Daily position evaluation
    DailyEvaluation,
    /// Parquet archive write
    ArchiveWrite,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Tickers scored in the latest scan
    TrackedTickers,
    /// Signals emitted by the latest scan
    SignalsGenerated,
    /// Open position count
    OpenPositions,
    /// Unrealized P&L across open positions
    UnrealizedPnl,
    /// Realized P&L across closed positions
    RealizedPnl,
    /// Current drawdown percentage
    DrawdownPct,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::VelocityCalculation => "pulsetrader_velocity_calc_latency_ms",
        LatencyMetric::SignalGeneration => "pulsetrader_signal_generation_latency_ms",
        LatencyMetric::DailyEvaluation => "pulsetrader_daily_evaluation_latency_ms",
        LatencyMetric::ArchiveWrite => "pulsetrader_archive_write_latency_ms",
    };

    metrics::histogram!(metric_name).record(duration.as_millis() as f64);
    tracing::debug!(
        metric = metric_name,
        value_ms = duration.as_millis(),
        "Recording latency"
    );
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::TrackedTickers => "pulsetrader_tracked_tickers",
        GaugeMetric::SignalsGenerated => "pulsetrader_signals_generated",
        GaugeMetric::OpenPositions => "pulsetrader_open_positions",
        GaugeMetric::UnrealizedPnl => "pulsetrader_unrealized_pnl_usd",
        GaugeMetric::RealizedPnl => "pulsetrader_realized_pnl_usd",
        GaugeMetric::DrawdownPct => "pulsetrader_drawdown_pct",
    };

    metrics::gauge!(metric_name).set(value);
}
