//! Backtest subcommand

use chrono::{NaiveDate, Utc};
use clap::Args;

use crate::backtest::{format_report, BacktestRunner};
use crate::config::Config;
use crate::data::ParquetArchive;
use crate::trading::ReplayPriceSource;

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Start of the backtest window (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// End of the backtest window (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

impl BacktestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
        if end < self.start {
            anyhow::bail!("end date {} is before start date {}", end, self.start);
        }

        let archive = ParquetArchive::new(&config.data.archive_dir);
        let signals = archive.read_all_signals()?;
        if signals.is_empty() {
            tracing::warn!("No archived signals to backtest");
        }

        let mut prices = ReplayPriceSource::new();
        for (ticker, date, price) in archive.price_table()? {
            prices.insert(ticker, date, price);
        }

        let runner = BacktestRunner::new(config.trading.clone(), config.backtest.clone());
        let result = runner.run(&signals, &prices, self.start, end);

        println!("{}", format_report(&result));
        Ok(())
    }
}
