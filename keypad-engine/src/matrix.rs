//! Key matrix scanning.
//!
//! Columns are driven one at a time; while a column is active every row
//! line is sampled, so a pressed switch at (row, col) shows up as an
//! active row. Two columns are never active together during a scan: with
//! more than one column driven, a row reading cannot be attributed to a
//! single switch.

use crate::error::ConfigError;
use crate::line::{InputLine, OutputLine};

/// Full R×C matrix state, row-major. `true` = pressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyState {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl KeyState {
    /// All keys released.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Out-of-range positions read as released.
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, pressed: bool) {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = pressed;
        }
    }

    /// Iterate the `(row, col)` of every pressed key, row-major.
    pub fn pressed(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &p)| p)
            .map(move |(i, _)| (i / cols, i % cols))
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&p| p).count()
    }

    /// Same number of rows and columns.
    pub fn same_shape(&self, other: &KeyState) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    /// Overwrite with `other`. Callers check `same_shape` first.
    pub(crate) fn copy_from(&mut self, other: &KeyState) {
        debug_assert!(self.same_shape(other));
        self.cells.copy_from_slice(&other.cells);
    }

    /// Check for a rectangle of pressed keys: two columns sharing at least
    /// two pressed rows.
    ///
    /// In a diode-less matrix any three corners of such a rectangle make the
    /// fourth read as pressed, so one of the four may be a ghost. This is
    /// only meaningful on a complete scan, and can't tell a real
    /// four-key press from a ghost.
    pub fn has_ghost_pattern(&self) -> bool {
        if self.count() <= 3 {
            return false;
        }
        for c1 in 0..self.cols {
            for c2 in c1 + 1..self.cols {
                let shared = (0..self.rows)
                    .filter(|&r| self.get(r, c1) && self.get(r, c2))
                    .count();
                if shared >= 2 {
                    return true;
                }
            }
        }
        false
    }
}

/// How the column lines sit between scans.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum IdleDrive {
    /// All columns inactive.
    Released,
    /// All columns active, so any press raises its row line.
    Armed,
}

/// Owns the line handles and produces full matrix snapshots.
pub struct ScanEngine<O, I> {
    columns: Vec<O>,
    rows: Vec<I>,
    current: KeyState,
    idle: IdleDrive,
}

impl<O: OutputLine, I: InputLine> ScanEngine<O, I> {
    pub fn new(columns: Vec<O>, rows: Vec<I>) -> Result<Self, ConfigError> {
        if columns.is_empty() || rows.is_empty() {
            return Err(ConfigError::EmptyMatrix);
        }
        let current = KeyState::new(rows.len(), columns.len());
        let mut engine = Self {
            columns,
            rows,
            current,
            idle: IdleDrive::Released,
        };
        engine.drive_all(false);
        Ok(engine)
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    /// Scan the entire matrix.
    ///
    /// Columns are walked in order: activate, sample every row, deactivate.
    /// A failed row read counts as released for this scan. The columns are
    /// returned to their idle drive afterwards.
    pub fn scan(&mut self) -> &KeyState {
        // Armed idle leaves every column active; clear them first
        if self.idle == IdleDrive::Armed {
            self.drive_all(false);
        }

        for col in 0..self.columns.len() {
            if let Err(fault) = self.columns[col].activate() {
                tracing::warn!(col, %fault, "column activate failed");
            }

            for row in 0..self.rows.len() {
                let pressed = match self.rows[row].is_active() {
                    Ok(level) => level,
                    Err(fault) => {
                        tracing::warn!(row, col, %fault, "row read failed, treating as released");
                        false
                    }
                };
                self.current.set(row, col, pressed);
            }

            if let Err(fault) = self.columns[col].deactivate() {
                tracing::warn!(col, %fault, "column deactivate failed");
            }
        }

        if self.idle == IdleDrive::Armed {
            self.drive_all(true);
        }

        tracing::trace!(pressed = self.current.count(), "scan complete");
        &self.current
    }

    /// The most recent scan result.
    pub fn current(&self) -> &KeyState {
        &self.current
    }

    /// Give the line handles back, columns first.
    pub fn into_lines(self) -> (Vec<O>, Vec<I>) {
        (self.columns, self.rows)
    }

    pub(crate) fn set_idle(&mut self, idle: IdleDrive) {
        self.idle = idle;
        self.drive_all(idle == IdleDrive::Armed);
    }

    /// With the columns armed, find a row whose level disagrees with the
    /// last scan. Any closed switch on a row raises it while armed, so the
    /// row should be active exactly when the scan found a key on it. A
    /// switch that moved after its column was sampled shows up here.
    pub(crate) fn unsettled_row(&mut self) -> Option<usize> {
        if self.idle != IdleDrive::Armed {
            return None;
        }
        for row in 0..self.rows.len() {
            let scanned = (0..self.columns.len()).any(|col| self.current.get(row, col));
            match self.rows[row].is_active() {
                Ok(active) if active != scanned => return Some(row),
                Ok(_) => {}
                Err(fault) => tracing::debug!(row, %fault, "row read failed, skipping level check"),
            }
        }
        None
    }

    pub(crate) fn row_lines_mut(&mut self) -> &mut [I] {
        &mut self.rows
    }

    pub(crate) fn row_lines(&self) -> &[I] {
        &self.rows
    }

    fn drive_all(&mut self, active: bool) {
        for (col, line) in self.columns.iter_mut().enumerate() {
            let result = if active {
                line.activate()
            } else {
                line.deactivate()
            };
            if let Err(fault) = result {
                tracing::warn!(col, active, %fault, "column drive failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimColumn, SimMatrix, SimRow};

    #[test]
    fn empty_line_sets_are_rejected() {
        let sim = SimMatrix::new(2, 2);
        let err = ScanEngine::new(Vec::<SimColumn>::new(), sim.row_lines()).err();
        assert!(matches!(err, Some(ConfigError::EmptyMatrix)));
        let err = ScanEngine::new(sim.column_lines(), Vec::<SimRow>::new()).err();
        assert!(matches!(err, Some(ConfigError::EmptyMatrix)));
    }

    #[test]
    fn scan_reports_pressed_switch() {
        let sim = SimMatrix::new(3, 5);
        let mut engine = ScanEngine::new(sim.column_lines(), sim.row_lines()).unwrap();
        sim.press(2, 4);

        let state = engine.scan();
        assert_eq!(state.pressed().collect::<Vec<_>>(), vec![(2, 4)]);
        assert_eq!(state.rows(), 3);
        assert_eq!(state.cols(), 5);
    }

    #[test]
    fn scan_drives_one_column_at_a_time() {
        let sim = SimMatrix::new(6, 4);
        let mut engine = ScanEngine::new(sim.column_lines(), sim.row_lines()).unwrap();
        sim.press(0, 0);
        sim.press(5, 3);

        engine.scan();
        assert_eq!(sim.peak_driven_at_read(), 1);
        assert_eq!(sim.driven_columns(), 0);
    }

    #[test]
    fn armed_scan_clears_columns_first_and_rearms() {
        let sim = SimMatrix::new(2, 3);
        let mut engine = ScanEngine::new(sim.column_lines(), sim.row_lines()).unwrap();
        engine.set_idle(IdleDrive::Armed);
        assert_eq!(sim.driven_columns(), 3);
        sim.press(1, 1);

        let state = engine.scan().clone();
        assert_eq!(state.pressed().collect::<Vec<_>>(), vec![(1, 1)]);
        assert_eq!(sim.peak_driven_at_read(), 1);
        assert_eq!(sim.driven_columns(), 3);
    }

    #[test]
    fn armed_rows_are_checked_against_the_scan() {
        let sim = SimMatrix::new(3, 3);
        let mut engine = ScanEngine::new(sim.column_lines(), sim.row_lines()).unwrap();
        sim.press(1, 1);
        engine.scan();
        // Released idle reads nothing back
        assert_eq!(engine.unsettled_row(), None);

        engine.set_idle(IdleDrive::Armed);
        engine.scan();
        assert_eq!(engine.unsettled_row(), None);

        sim.press(2, 0);
        assert_eq!(engine.unsettled_row(), Some(2));
        engine.scan();
        assert_eq!(engine.unsettled_row(), None);

        sim.release(1, 1);
        assert_eq!(engine.unsettled_row(), Some(1));
    }

    #[test]
    fn failed_read_counts_as_released() {
        let sim = SimMatrix::new(2, 2);
        let mut engine = ScanEngine::new(sim.column_lines(), sim.row_lines()).unwrap();
        sim.press(1, 0);
        sim.fail_row(1, true);
        assert_eq!(engine.scan().count(), 0);

        sim.fail_row(1, false);
        assert!(engine.scan().get(1, 0));
    }

    #[test]
    fn ghost_pattern_needs_a_rectangle() {
        let mut state = KeyState::new(3, 3);
        state.set(0, 0, true);
        state.set(0, 1, true);
        state.set(1, 0, true);
        assert!(!state.has_ghost_pattern());
        state.set(1, 1, true);
        assert!(state.has_ghost_pattern());

        let mut diagonal = KeyState::new(3, 3);
        for i in 0..3 {
            diagonal.set(i, i, true);
        }
        diagonal.set(0, 2, true);
        assert!(!diagonal.has_ghost_pattern());
    }

    #[test]
    fn out_of_range_cells_are_released() {
        let mut state = KeyState::new(2, 2);
        state.set(5, 5, true);
        assert_eq!(state.count(), 0);
        assert!(!state.get(5, 5));
    }
}
