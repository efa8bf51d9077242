//! Backfill subcommand: idempotent retroactive position creation

use chrono::{Duration, Utc};
use clap::Args;

use crate::config::Config;
use crate::data::ParquetArchive;
use crate::trading::{ReplayPriceSource, TradeSimulator};

#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Lookback window in days; defaults to trading.backfill_days
    #[arg(long)]
    pub days: Option<i64>,
}

impl BackfillArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let days = self.days.unwrap_or(config.trading.backfill_days);
        let cutoff = Utc::now() - Duration::days(days);

        let archive = ParquetArchive::new(&config.data.archive_dir);
        let signals: Vec<_> = archive
            .read_all_signals()?
            .into_iter()
            .filter(|s| s.created_at >= cutoff)
            .collect();

        tracing::info!(days, signals = signals.len(), "Backfilling paper trades");

        let mut prices = ReplayPriceSource::new();
        for (ticker, date, price) in archive.price_table()? {
            prices.insert(ticker, date, price);
        }

        let mut simulator = TradeSimulator::new(config.trading.clone());
        let stats = simulator.backfill(&signals, &prices);

        println!(
            "Backfill complete: {} trades created, {} skipped",
            stats.created, stats.skipped
        );
        Ok(())
    }
}
