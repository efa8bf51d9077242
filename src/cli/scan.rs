//! Scan subcommand: the daily paper-trading run

use chrono::{DateTime, Duration, Utc};
use clap::Args;

use crate::backtest::BacktestRunner;
use crate::config::Config;
use crate::data::ParquetArchive;
use crate::pipeline::{MarketDataProvider, ScanEngine};
use crate::trading::ReplayPriceSource;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Scan time override (RFC 3339); defaults to now
    #[arg(long)]
    pub as_of: Option<DateTime<Utc>>,

    /// Print signals without touching the paper ledger
    #[arg(long)]
    pub dry_run: bool,
}

impl ScanArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let as_of = self.as_of.unwrap_or_else(Utc::now);
        let archive = ParquetArchive::new(&config.data.archive_dir);

        let tickers = archive.ticker_data().await?;
        if tickers.is_empty() {
            tracing::warn!("No archived observations, nothing to scan");
            return Ok(());
        }

        let engine = ScanEngine::new(config);
        let outcome = engine.run(&tickers, as_of);

        println!("Signals ({}):", outcome.signals.len());
        for signal in &outcome.signals {
            println!(
                "  {:<6} conviction {:>5.1}  [{}]  {}",
                signal.ticker,
                signal.conviction,
                signal.signal_type(),
                signal.notes
            );
        }

        if self.dry_run {
            return Ok(());
        }

        archive.write_signals(&outcome.signals, as_of)?;

        // Reconstruct the paper ledger from the archived signal history,
        // then replay through today. Backfill idempotence makes this
        // safe to repeat daily.
        let mut signals = archive.read_all_signals()?;
        signals.extend(outcome.signals.iter().cloned());

        let mut prices = ReplayPriceSource::new();
        for (ticker, date, price) in archive.price_table()? {
            prices.insert(ticker, date, price);
        }

        let today = as_of.date_naive();
        let start = today - Duration::days(config.trading.backfill_days);
        let runner = BacktestRunner::new(config.trading.clone(), config.backtest.clone());
        let result = runner.run(&signals, &prices, start, today);

        let closed = result.trades.iter().collect::<Vec<_>>();
        archive.write_closed_trades(&closed, as_of)?;

        println!("{}", result.summary.format_table());
        Ok(())
    }
}
