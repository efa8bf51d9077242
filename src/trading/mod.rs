//! Trade simulation module
//!
//! One state machine for opening, tracking, and closing simulated
//! positions. The daily paper-trading loop and the historical backtest
//! both drive this module; the only variation point between them is the
//! price source.

mod position;
mod price_source;
mod simulator;

pub use position::{ExitReason, ExitRecord, Position, PositionLedger, PositionStatus, Snapshot};
pub use price_source::{LivePriceTable, PriceSource, ReplayPriceSource};
pub use simulator::{BackfillStats, EntryOutcome, TradeSimulator};
