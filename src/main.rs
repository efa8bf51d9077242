use clap::Parser;
use pulse_trader::cli::{Cli, Commands};
use pulse_trader::config::Config;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing file falls back to defaults; an invalid file is fatal
    // before any processing starts.
    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!(
            "Warning: config file {} not found, using defaults",
            cli.config
        );
        Config::default()
    };

    pulse_trader::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Scan(args) => {
            tracing::info!("Starting scan");
            args.execute(&config).await?;
        }
        Commands::Backtest(args) => {
            tracing::info!("Starting backtest");
            args.execute(&config).await?;
        }
        Commands::Backfill(args) => {
            tracing::info!("Starting backfill");
            args.execute(&config).await?;
        }
        Commands::Status => {
            println!("pulse-trader status");
            println!("  Archive: {}", config.data.archive_dir.display());
            println!("  Mode: Paper Trading");
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Weights: 24h={} 7d={} sentiment={} divergence={}",
                config.weights.mention_24h,
                config.weights.mention_7d,
                config.weights.sentiment,
                config.weights.divergence
            );
            println!("  Signal floor: {}", config.signals.minimum_conviction);
            println!(
                "  Trading: conviction>={} base=${} max_open={} hold={}d stop={}% target={}%",
                config.trading.min_conviction,
                config.trading.base_position_size,
                config.trading.max_open_positions,
                config.trading.hold_days,
                config.trading.stop_loss_pct,
                config.trading.take_profit_pct
            );
            println!("  Benchmark: {}", config.backtest.benchmark_ticker);
        }
    }

    Ok(())
}
