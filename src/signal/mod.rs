//! Signal generation module
//!
//! Evaluates independent trigger predicates over velocity metrics and
//! auxiliary ticker context, fuses them into a capped conviction score,
//! and emits ranked signals.

mod generator;
mod types;

pub use generator::{SignalContext, SignalGenerator, SignalInputs};
pub use types::{Signal, TriggerKind};
