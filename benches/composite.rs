//! Benchmarks for the velocity scoring hot path

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pulse_trader::config::{ScalesConfig, VelocityConfig, WeightsConfig};
use pulse_trader::observation::{Observation, ObservationSeries};
use pulse_trader::velocity::{composite_score, VelocityEngine};
use rust_decimal_macros::dec;

fn benchmark_composite_score(c: &mut Criterion) {
    let weights = WeightsConfig::default();
    let scales = ScalesConfig::default();

    c.bench_function("composite_score", |b| {
        b.iter(|| {
            composite_score(
                black_box(150.0),
                black_box(4.2),
                black_box(0.3),
                black_box(-0.8),
                &weights,
                &scales,
            )
        })
    });
}

fn benchmark_ticker_calculation(c: &mut Criterion) {
    let engine = VelocityEngine::new(
        WeightsConfig::default(),
        ScalesConfig::default(),
        VelocityConfig::default(),
    );

    let as_of = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
    let observations = (0..60)
        .map(|i| Observation {
            ticker: "GME".to_string(),
            timestamp: as_of - Duration::hours(60 - i),
            mentions: Some(10 + (i as u32 % 17) * 3),
            price: Some(dec!(25) + rust_decimal::Decimal::from(i % 5)),
            sentiment: Some(0.1 + (i % 10) as f64 * 0.02),
        })
        .collect();
    let series = ObservationSeries::from_observations("GME", observations);

    c.bench_function("velocity_engine_calculate", |b| {
        b.iter(|| engine.calculate(black_box(&series), black_box(as_of)))
    });
}

criterion_group!(
    benches,
    benchmark_composite_score,
    benchmark_ticker_calculation
);
criterion_main!(benches);
