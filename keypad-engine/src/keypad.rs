//! The owned keypad handle.
//!
//! A [`Keypad`] exclusively owns its line handles; there is no global
//! hardware state. It is not `Clone`: a scanning strategy takes the keypad
//! by value and hands it back when stopped, so only one strategy ever
//! drives a given set of lines.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use keypad_symbols::{Symbol, SymbolMap};

use crate::config::KeypadConfig;
use crate::debounce::Debouncer;
use crate::edge::{EdgeTracker, Event};
use crate::error::{ConfigError, StrategyError};
use crate::guard::{Core, CycleState, Guard};
use crate::line::{EdgeSink, InputLine, OutputLine, RowEdge};
use crate::matrix::{IdleDrive, KeyState, ScanEngine};

pub struct Keypad<O, I> {
    guard: Arc<Guard<O, I>>,
    config: KeypadConfig,
}

impl<O: OutputLine, I: InputLine> Keypad<O, I> {
    /// Build a keypad over the given lines.
    ///
    /// `columns[c]` drives column `c` and `rows[r]` senses row `r`; the
    /// symbol map must have exactly that many rows and columns. All checks
    /// happen here, before any line is scanned.
    pub fn new(
        columns: Vec<O>,
        rows: Vec<I>,
        symbols: SymbolMap,
        config: KeypadConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if columns.is_empty() || rows.is_empty() {
            return Err(ConfigError::EmptyMatrix);
        }
        if symbols.rows() != rows.len() || symbols.cols() != columns.len() {
            return Err(ConfigError::Dimensions {
                map_rows: symbols.rows(),
                map_cols: symbols.cols(),
                rows: rows.len(),
                cols: columns.len(),
            });
        }

        let (row_count, col_count) = (rows.len(), columns.len());
        let core = Core {
            engine: ScanEngine::new(columns, rows)?,
            debouncer: Debouncer::new(config.debounce, row_count, col_count),
            tracker: EdgeTracker::new(row_count, col_count),
        };

        tracing::debug!(rows = row_count, cols = col_count, debounce = ?config.debounce, "keypad ready");
        Ok(Self {
            guard: Arc::new(Guard::new(core, symbols)),
            config,
        })
    }

    pub fn rows(&self) -> usize {
        self.guard.symbols().rows()
    }

    pub fn cols(&self) -> usize {
        self.guard.symbols().cols()
    }

    pub fn symbols(&self) -> &SymbolMap {
        self.guard.symbols()
    }

    pub fn config(&self) -> &KeypadConfig {
        &self.config
    }

    pub fn state(&self) -> CycleState {
        self.guard.state()
    }

    /// Scan once, debounce and diff against the previous snapshot.
    pub fn cycle(&self, now: Instant) -> Vec<Event> {
        self.guard.cycle(now)
    }

    /// Rescan in response to a row edge, without debounce. See
    /// [`InterruptTriggered`](crate::InterruptTriggered) for the hazards.
    pub fn rescan_on_edge(&self, edge: RowEdge, now: Instant) -> Vec<Event> {
        self.guard.rescan(edge, now)
    }

    /// Keys the edge tracker currently considers held.
    pub fn held(&self) -> Vec<(usize, usize, Symbol)> {
        let previous = self.guard.previous();
        let symbols = self.guard.symbols();
        previous
            .pressed()
            .map(|(row, col)| (row, col, symbols.get(row, col).unwrap_or(Symbol::UNUSED)))
            .collect()
    }

    /// The tracker's previous snapshot.
    pub fn snapshot(&self) -> KeyState {
        self.guard.previous()
    }

    /// Whether every row line can report level changes.
    pub fn supports_interrupts(&self) -> bool {
        self.first_unwatchable_row().is_none()
    }

    /// Release the columns and give the line handles back.
    ///
    /// Returns `None` only if a strategy worker still shares the keypad,
    /// which can't happen once the strategy has been stopped.
    pub fn shutdown(self) -> Option<(Vec<O>, Vec<I>)> {
        let guard = Arc::try_unwrap(self.guard).ok()?;
        let mut engine = guard.into_core().engine;
        engine.set_idle(IdleDrive::Released);
        Some(engine.into_lines())
    }

    pub(crate) fn guard(&self) -> Arc<Guard<O, I>> {
        Arc::clone(&self.guard)
    }

    /// Arm the matrix and route every row's level changes into `tx`.
    pub(crate) fn attach_edges(&self, tx: &Sender<RowEdge>) -> Result<(), StrategyError> {
        if let Some(row) = self.first_unwatchable_row() {
            return Err(StrategyError::Unsupported { row });
        }

        let flag = self.guard.scanning_flag();
        let mut core = self.guard.lock();
        core.engine.set_idle(IdleDrive::Armed);
        for (row, line) in core.engine.row_lines_mut().iter_mut().enumerate() {
            line.watch(EdgeSink::new(row, tx.clone(), Arc::clone(&flag)));
        }
        Ok(())
    }

    /// Stop edge reporting and return the columns to released idle.
    pub(crate) fn detach_edges(&self) {
        let mut core = self.guard.lock();
        for line in core.engine.row_lines_mut() {
            line.unwatch();
        }
        core.engine.set_idle(IdleDrive::Released);
    }

    fn first_unwatchable_row(&self) -> Option<usize> {
        let core = self.guard.lock();
        core.engine
            .row_lines()
            .iter()
            .position(|line| !line.supports_watch())
    }
}
