//! Simulated diode-less switch matrix.
//!
//! Stands in for real GPIO in the console tool and the tests. Current
//! flows from every driven column through any chain of closed switches,
//! so a row reads active when such a chain reaches it. That is exactly
//! how ghosting happens on real hardware: with (0,0), (0,1) and (1,0)
//! closed, driving column 1 reaches row 1 via row 0 and column 0.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::LineFault;
use crate::line::{EdgeSink, InputLine, Level, OutputLine};

#[derive(Debug)]
struct SimState {
    rows: usize,
    cols: usize,
    closed: Vec<bool>,
    driven: Vec<bool>,
    levels: Vec<bool>,
    faulty: Vec<bool>,
    sinks: Vec<Option<EdgeSink>>,
    peak_driven: usize,
}

impl SimState {
    fn switch(&self, row: usize, col: usize) -> bool {
        self.closed[row * self.cols + col]
    }

    /// Rows reachable from any driven column through closed switches.
    fn reachable_rows(&self) -> Vec<bool> {
        let mut rows = vec![false; self.rows];
        let mut cols = self.driven.clone();
        let mut changed = true;
        while changed {
            changed = false;
            for r in 0..self.rows {
                for c in 0..self.cols {
                    if !self.switch(r, c) || rows[r] == cols[c] {
                        continue;
                    }
                    rows[r] = true;
                    cols[c] = true;
                    changed = true;
                }
            }
        }
        rows
    }

    /// Recompute row levels and report the ones that moved.
    fn settle(&mut self) {
        let levels = self.reachable_rows();
        for (row, &level) in levels.iter().enumerate() {
            if level != self.levels[row] {
                if let Some(sink) = &self.sinks[row] {
                    sink.notify(Level::from(level));
                }
            }
        }
        self.levels = levels;
    }
}

/// Handle on a simulated matrix. Clones share the same switches.
#[derive(Clone, Debug)]
pub struct SimMatrix {
    state: Arc<Mutex<SimState>>,
}

impl SimMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        let state = SimState {
            rows,
            cols,
            closed: vec![false; rows * cols],
            driven: vec![false; cols],
            levels: vec![false; rows],
            faulty: vec![false; rows],
            sinks: vec![None; rows],
            peak_driven: 0,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn rows(&self) -> usize {
        self.lock().rows
    }

    pub fn cols(&self) -> usize {
        self.lock().cols
    }

    /// One output handle per column, in column order.
    pub fn column_lines(&self) -> Vec<SimColumn> {
        (0..self.cols())
            .map(|col| SimColumn {
                col,
                matrix: self.clone(),
            })
            .collect()
    }

    /// One input handle per row, in row order.
    pub fn row_lines(&self) -> Vec<SimRow> {
        (0..self.rows())
            .map(|row| SimRow {
                row,
                matrix: self.clone(),
            })
            .collect()
    }

    pub fn press(&self, row: usize, col: usize) {
        self.set_switch(row, col, true);
    }

    pub fn release(&self, row: usize, col: usize) {
        self.set_switch(row, col, false);
    }

    /// Close or open the switch at (row, col). Out-of-range is ignored.
    pub fn set_switch(&self, row: usize, col: usize, closed: bool) {
        let mut state = self.lock();
        if row >= state.rows || col >= state.cols {
            return;
        }
        let idx = row * state.cols + col;
        state.closed[idx] = closed;
        state.settle();
    }

    pub fn is_closed(&self, row: usize, col: usize) -> bool {
        let state = self.lock();
        row < state.rows && col < state.cols && state.switch(row, col)
    }

    /// Make reads of `row` fail until cleared.
    pub fn fail_row(&self, row: usize, failing: bool) {
        if let Some(f) = self.lock().faulty.get_mut(row) {
            *f = failing;
        }
    }

    /// Number of columns currently driven.
    pub fn driven_columns(&self) -> usize {
        self.lock().driven.iter().filter(|&&d| d).count()
    }

    /// Highest number of simultaneously driven columns seen by any row read.
    pub fn peak_driven_at_read(&self) -> usize {
        self.lock().peak_driven
    }

    pub fn reset_peak(&self) {
        self.lock().peak_driven = 0;
    }

    /// Whether a row line currently has an edge sink attached.
    pub fn is_watched(&self, row: usize) -> bool {
        self.lock().sinks.get(row).is_some_and(Option::is_some)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drive(&self, col: usize, active: bool) {
        let mut state = self.lock();
        state.driven[col] = active;
        state.settle();
    }

    fn read(&self, row: usize) -> Result<bool, LineFault> {
        let mut state = self.lock();
        let driven = state.driven.iter().filter(|&&d| d).count();
        state.peak_driven = state.peak_driven.max(driven);
        if state.faulty[row] {
            return Err(LineFault::new(format!("simulated fault on row {row}")));
        }
        Ok(state.reachable_rows()[row])
    }
}

/// Simulated column output.
#[derive(Debug)]
pub struct SimColumn {
    col: usize,
    matrix: SimMatrix,
}

impl OutputLine for SimColumn {
    fn activate(&mut self) -> Result<(), LineFault> {
        self.matrix.drive(self.col, true);
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), LineFault> {
        self.matrix.drive(self.col, false);
        Ok(())
    }
}

/// Simulated row input with edge reporting.
#[derive(Debug)]
pub struct SimRow {
    row: usize,
    matrix: SimMatrix,
}

impl InputLine for SimRow {
    fn is_active(&mut self) -> Result<bool, LineFault> {
        self.matrix.read(self.row)
    }

    fn supports_watch(&self) -> bool {
        true
    }

    fn watch(&mut self, sink: EdgeSink) {
        self.matrix.lock().sinks[self.row] = Some(sink);
    }

    fn unwatch(&mut self) {
        self.matrix.lock().sinks[self.row] = None;
    }
}
