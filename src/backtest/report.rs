//! Backtest report formatting

use super::BacktestResult;
use crate::trading::Position;
use rust_decimal::Decimal;

/// Format a complete backtest report for CLI output
pub fn format_report(result: &BacktestResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Period: {} to {}\n",
        result.start_date, result.end_date
    ));
    out.push_str(&result.summary.format_table());

    let mut winners: Vec<&Position> = result
        .trades
        .iter()
        .filter(|t| exit_pnl(t) > Decimal::ZERO)
        .collect();
    winners.sort_by(|a, b| exit_return(b).cmp(&exit_return(a)));

    let mut losers: Vec<&Position> = result
        .trades
        .iter()
        .filter(|t| exit_pnl(t) < Decimal::ZERO)
        .collect();
    losers.sort_by(|a, b| exit_return(a).cmp(&exit_return(b)));

    if !winners.is_empty() {
        out.push_str("\nTOP WINNING TRADES\n");
        out.push_str("───────────────────────────────────────────────────────\n");
        for (i, trade) in winners.iter().take(5).enumerate() {
            out.push_str(&format_trade_line(i + 1, trade));
        }
    }

    if !losers.is_empty() {
        out.push_str("\nTOP LOSING TRADES\n");
        out.push_str("───────────────────────────────────────────────────────\n");
        for (i, trade) in losers.iter().take(5).enumerate() {
            out.push_str(&format_trade_line(i + 1, trade));
        }
    }

    if result.open_at_end > 0 {
        out.push_str(&format!(
            "\n{} position(s) still open at end of replay\n",
            result.open_at_end
        ));
    }

    out
}

fn format_trade_line(rank: usize, trade: &Position) -> String {
    match &trade.exit {
        Some(exit) => format!(
            "  {}. {}: {:+.2}% ({:+.2}) - {}\n",
            rank,
            trade.ticker,
            exit.return_pct,
            exit.profit_loss,
            exit.exit_reason.as_str()
        ),
        None => String::new(),
    }
}

fn exit_pnl(trade: &Position) -> Decimal {
    trade.exit.as_ref().map(|e| e.profit_loss).unwrap_or_default()
}

fn exit_return(trade: &Position) -> Decimal {
    trade.exit.as_ref().map(|e| e.return_pct).unwrap_or_default()
}
