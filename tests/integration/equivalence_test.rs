//! Live paper trading and backtest replay must agree
//!
//! Both modes share one simulator; given identical price input they
//! must produce identical closed positions.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use pulse_trader::backtest::BacktestRunner;
use pulse_trader::config::{BacktestConfig, TradingConfig};
use pulse_trader::signal::{Signal, TriggerKind};
use pulse_trader::trading::{LivePriceTable, Position, ReplayPriceSource, TradeSimulator};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn signal(ticker: &str, conviction: f64, price: Decimal, day: u32) -> Signal {
    Signal::new(
        ticker,
        vec![TriggerKind::VelocitySpike],
        conviction,
        Some(price),
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
        String::new(),
    )
}

/// Synthetic daily paths: one stop-loss, one take-profit, one
/// held through the window
fn price_paths() -> Vec<(&'static str, Vec<(u32, Decimal)>)> {
    vec![
        (
            "STOP",
            vec![
                (1, dec!(100)),
                (2, dec!(96)),
                (3, dec!(90)),
                (4, dec!(95)),
                (5, dec!(120)),
            ],
        ),
        (
            "PROFIT",
            vec![
                (1, dec!(50)),
                (2, dec!(54)),
                (3, dec!(58)),
                (4, dec!(61)),
            ],
        ),
        (
            "HELD",
            (1..=15).map(|d| (d, dec!(200))).collect(),
        ),
    ]
}

fn signals() -> Vec<Signal> {
    vec![
        signal("STOP", 80.0, dec!(100), 1),
        signal("PROFIT", 75.0, dec!(50), 1),
        signal("HELD", 90.0, dec!(200), 1),
    ]
}

fn replay_source() -> ReplayPriceSource {
    let mut prices = ReplayPriceSource::new();
    for (ticker, path) in price_paths() {
        prices.insert_series(ticker, path.into_iter().map(|(d, p)| (date(d), p)));
    }
    prices
}

/// Drive the simulator the way the live daily loop does: one price
/// table per day, entries on the signal day, then evaluation
fn run_live_mode(end_day: u32) -> Vec<Position> {
    let mut simulator = TradeSimulator::new(TradingConfig::default());
    let signals = signals();

    for day in 1..=end_day {
        let mut table = LivePriceTable::new(date(day));
        for (ticker, path) in price_paths() {
            if let Some((_, price)) = path.iter().find(|(d, _)| *d == day) {
                table.set(ticker, *price);
            }
        }

        if day == 1 {
            simulator.process_signals(&signals, date(1), &table);
        }
        simulator.evaluate_day(date(day), &table);
    }

    simulator
        .ledger()
        .closed_positions()
        .into_iter()
        .cloned()
        .collect()
}

#[test]
fn backtest_replay_matches_live_mode() {
    let live_closed = run_live_mode(15);

    let runner = BacktestRunner::new(TradingConfig::default(), BacktestConfig::default());
    let result = runner.run(&signals(), &replay_source(), date(1), date(15));

    assert_eq!(live_closed.len(), result.trades.len());
    for (live, replayed) in live_closed.iter().zip(&result.trades) {
        assert_eq!(live.ticker, replayed.ticker);
        assert_eq!(live.entry_date, replayed.entry_date);
        assert_eq!(live.entry_price, replayed.entry_price);
        assert_eq!(live.shares, replayed.shares);

        let (le, re) = (
            live.exit.as_ref().unwrap(),
            replayed.exit.as_ref().unwrap(),
        );
        assert_eq!(le.exit_date, re.exit_date);
        assert_eq!(le.exit_reason, re.exit_reason);
        assert_eq!(le.exit_price, re.exit_price);
        assert_eq!(le.return_pct, re.return_pct);
        assert_eq!(le.profit_loss, re.profit_loss);
        assert_eq!(le.days_held, re.days_held);
    }
}

#[test]
fn stop_loss_path_never_reaches_later_highs() {
    let runner = BacktestRunner::new(TradingConfig::default(), BacktestConfig::default());
    let result = runner.run(&signals(), &replay_source(), date(1), date(15));

    let stop = result
        .trades
        .iter()
        .find(|t| t.ticker == "STOP")
        .expect("STOP should close");
    let exit = stop.exit.as_ref().unwrap();

    assert_eq!(exit.exit_date, date(3));
    assert_eq!(exit.exit_price, dec!(90));
    assert_eq!(exit.return_pct, dec!(-10));
}

#[test]
fn open_positions_identical_across_modes() {
    let mut live_sim = TradeSimulator::new(TradingConfig::default());
    let sigs = signals();
    for day in 1..=10 {
        let mut table = LivePriceTable::new(date(day));
        for (ticker, path) in price_paths() {
            if let Some((_, price)) = path.iter().find(|(d, _)| *d == day) {
                table.set(ticker, *price);
            }
        }
        if day == 1 {
            live_sim.process_signals(&sigs, date(1), &table);
        }
        live_sim.evaluate_day(date(day), &table);
    }

    let runner = BacktestRunner::new(TradingConfig::default(), BacktestConfig::default());
    let result = runner.run(&sigs, &replay_source(), date(1), date(10));

    // HELD stays open in both modes
    let live_open: Vec<String> = live_sim
        .open_positions()
        .iter()
        .map(|p| p.ticker.clone())
        .collect();
    assert_eq!(live_open, vec!["HELD".to_string()]);
    assert_eq!(result.open_at_end, 1);
}
