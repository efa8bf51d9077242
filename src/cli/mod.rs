//! CLI interface for pulse-trader
//!
//! Provides subcommands for:
//! - `scan`: score tickers, emit signals, update the paper ledger
//! - `backtest`: replay archived signals over a date range
//! - `backfill`: idempotent retroactive position creation
//! - `status`: show current state
//! - `config`: show configuration

mod backfill;
mod backtest;
mod scan;

pub use backfill::BackfillArgs;
pub use backtest::BacktestArgs;
pub use scan::ScanArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pulse-trader")]
#[command(about = "Sentiment velocity signal engine and paper trading simulator")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score tickers, emit signals, and update the paper ledger
    Scan(ScanArgs),
    /// Run a backtest over archived signals
    Backtest(BacktestArgs),
    /// Backfill paper positions from archived signals
    Backfill(BackfillArgs),
    /// Show current state
    Status,
    /// Show configuration
    Config,
}
