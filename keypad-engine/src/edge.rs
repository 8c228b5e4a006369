//! Edge detection: snapshot diffs become press/release events.

use std::time::Instant;

use keypad_symbols::{Symbol, SymbolMap};

use crate::matrix::KeyState;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Pressed,
    Released,
}

/// One key transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub row: usize,
    pub col: usize,
    pub symbol: Symbol,
    pub kind: EventKind,
    pub timestamp: Instant,
}

impl Event {
    /// Same key, same transition. Ignores the timestamp.
    pub fn matches(&self, row: usize, col: usize, kind: EventKind) -> bool {
        self.row == row && self.col == col && self.kind == kind
    }
}

/// Receives events outside the keypad lock.
pub trait Consumer: Send + 'static {
    fn deliver(&mut self, event: Event);
}

impl<F: FnMut(Event) + Send + 'static> Consumer for F {
    fn deliver(&mut self, event: Event) {
        self(event)
    }
}

/// Remembers the previous snapshot and reports what changed.
pub struct EdgeTracker {
    previous: KeyState,
}

impl EdgeTracker {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            previous: KeyState::new(rows, cols),
        }
    }

    pub fn previous(&self) -> &KeyState {
        &self.previous
    }

    /// Diff `current` against the previous snapshot, then make it the new
    /// previous. One event per differing cell, row-major order.
    ///
    /// A key held across many scans yields a single `Pressed`; nothing
    /// repeats until it is released. A snapshot of another shape is
    /// ignored and leaves the previous snapshot as it was.
    pub fn diff(&mut self, current: &KeyState, symbols: &SymbolMap, now: Instant) -> Vec<Event> {
        if !self.previous.same_shape(current) {
            tracing::warn!(
                rows = current.rows(),
                cols = current.cols(),
                expected_rows = self.previous.rows(),
                expected_cols = self.previous.cols(),
                "snapshot shape mismatch, ignoring"
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        for row in 0..current.rows() {
            for col in 0..current.cols() {
                let was = self.previous.get(row, col);
                let is = current.get(row, col);
                if was == is {
                    continue;
                }
                let kind = if is {
                    EventKind::Pressed
                } else {
                    EventKind::Released
                };
                events.push(Event {
                    row,
                    col,
                    symbol: symbols.get(row, col).unwrap_or(Symbol::UNUSED),
                    kind,
                    timestamp: now,
                });
            }
        }

        self.previous.copy_from(current);
        events
    }
}
