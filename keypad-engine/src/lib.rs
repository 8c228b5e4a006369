//! Matrix keypad scanning engine.
//!
//! Turns the raw electrical state of a rows × columns switch matrix into
//! edge-triggered press/release events:
//! - Column lines are driven one at a time and row lines sampled
//!   ([`ScanEngine`])
//! - Optional per-key debouncing ([`Debouncer`])
//! - Snapshot diffing into [`Event`]s ([`EdgeTracker`])
//! - One mutex guarding hardware and the previous snapshot ([`Keypad`])
//! - Two scheduling strategies: a fixed-period [`PollingLoop`] and row
//!   edge driven [`InterruptTriggered`]
//!
//! The engine does not reject ghosts. In a diode-less matrix three keys
//! pressed in an "L" make the fourth corner of the rectangle read as
//! pressed, and that phantom key is reported like any other.

mod config;
mod debounce;
mod edge;
mod error;
mod guard;
pub mod hal;
mod interrupt;
mod keypad;
mod line;
mod matrix;
mod polling;
pub mod sim;

pub use config::KeypadConfig;
pub use debounce::{Debounce, Debouncer};
pub use edge::{Consumer, EdgeTracker, Event, EventKind};
pub use error::{ConfigError, LineFault, StrategyError};
pub use guard::CycleState;
pub use interrupt::InterruptTriggered;
pub use keypad::Keypad;
pub use line::{EdgeSink, InputLine, Level, OutputLine, RowEdge};
pub use matrix::{KeyState, ScanEngine};
pub use polling::PollingLoop;

pub use keypad_symbols::{Symbol, SymbolMap};
