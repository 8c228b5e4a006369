use std::io;

use keypad_symbols::ShapeError;

/// Construction-time configuration problems. Nothing is scanned when one
/// of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("matrix needs at least one row line and one column line")]
    EmptyMatrix,
    #[error(
        "symbol map is {map_rows}x{map_cols} but {rows} row lines and {cols} column lines were supplied"
    )]
    Dimensions {
        map_rows: usize,
        map_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("poll period must be non-zero")]
    ZeroPeriod,
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// A strategy could not take over the keypad.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("row line {row} cannot report level changes")]
    Unsupported { row: usize },
    #[error("failed to spawn {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Failure reading or driving a single line.
///
/// Scans treat this as an inactive read; it never leaves the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line fault: {0}")]
pub struct LineFault(String);

impl LineFault {
    pub fn new(reason: impl Into<String>) -> Self {
        LineFault(reason.into())
    }
}
