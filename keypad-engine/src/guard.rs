//! Mutual exclusion over the line hardware and the previous snapshot.
//!
//! One lock spans the whole scan plus the comparison against the previous
//! snapshot, so an edge is always computed from a complete, non-overlapping
//! scan. Events are handed back to the caller and delivered after the lock
//! is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use keypad_symbols::{Symbol, SymbolMap};

use crate::debounce::Debouncer;
use crate::edge::{EdgeTracker, Event, EventKind};
use crate::line::{InputLine, Level, OutputLine, RowEdge};
use crate::matrix::{KeyState, ScanEngine};

/// Scans per edge before a row that keeps moving is left to its next edge.
const MAX_RESCAN_PASSES: usize = 4;

/// Where the keypad is within a scan cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Scanning,
}

/// Everything the lock protects.
pub(crate) struct Core<O, I> {
    pub engine: ScanEngine<O, I>,
    pub debouncer: Debouncer,
    pub tracker: EdgeTracker,
}

pub(crate) struct Guard<O, I> {
    core: Mutex<Core<O, I>>,
    scanning: Arc<AtomicBool>,
    symbols: SymbolMap,
}

/// Lowers the scanning flag when dropped, also on unwind.
struct ScanningFlag<'a>(&'a AtomicBool);

impl<'a> ScanningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        ScanningFlag(flag)
    }
}

impl Drop for ScanningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<O: OutputLine, I: InputLine> Guard<O, I> {
    pub fn new(core: Core<O, I>, symbols: SymbolMap) -> Self {
        Self {
            core: Mutex::new(core),
            scanning: Arc::new(AtomicBool::new(false)),
            symbols,
        }
    }

    pub fn into_core(self) -> Core<O, I> {
        self.core.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn scanning_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.scanning)
    }

    pub fn state(&self) -> CycleState {
        if self.scanning.load(Ordering::Acquire) {
            CycleState::Scanning
        } else {
            CycleState::Idle
        }
    }

    /// Lock without entering the Scanning state.
    ///
    /// A panic mid-cycle can't leave the core half-updated in a way later
    /// cycles depend on (every scan rewrites the whole snapshot), so a
    /// poisoned lock is simply taken over.
    pub fn lock(&self) -> MutexGuard<'_, Core<O, I>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scan_locked<T>(&self, f: impl FnOnce(&mut Core<O, I>) -> T) -> T {
        let mut core = self.lock();
        let _flag = ScanningFlag::raise(&self.scanning);
        f(&mut *core)
    }

    /// One polling cycle: scan, debounce, diff.
    pub fn cycle(&self, now: Instant) -> Vec<Event> {
        let events = self.scan_locked(|core| {
            let Core {
                engine,
                debouncer,
                tracker,
            } = core;
            let raw = engine.scan();
            if raw.has_ghost_pattern() {
                tracing::debug!("pressed keys form a rectangle, one may be a ghost");
            }
            let stable = debouncer.update(raw, now);
            tracker.diff(stable, &self.symbols, now)
        });
        log_events(&events);
        events
    }

    /// Rescan after a row line changed level.
    ///
    /// The edge names only the row, so every column is walked again and the
    /// result compared against the previous snapshot, with no debounce.
    /// Edges are muted while the scan drives the columns, so once they are
    /// re-armed the rows are read back; a row that disagrees with the scan
    /// moved behind it and the matrix is walked again.
    /// A rising edge that turns up no new press is blamed on whatever is
    /// still held, and those keys are reported as pressed again.
    pub fn rescan(&self, edge: RowEdge, now: Instant) -> Vec<Event> {
        let mut core = self.lock();
        let Core {
            engine,
            debouncer,
            tracker,
        } = &mut *core;

        let mut events = Vec::new();
        for pass in 1..=MAX_RESCAN_PASSES {
            {
                let _flag = ScanningFlag::raise(&self.scanning);
                let current = engine.scan();
                events.extend(tracker.diff(current, &self.symbols, now));
            }
            // Edges are live again: a change from here on queues its own rescan
            let Some(row) = engine.unsettled_row() else {
                break;
            };
            if pass == MAX_RESCAN_PASSES {
                tracing::warn!(row, pass, "row still disagrees with the scan, giving up");
            } else {
                tracing::debug!(row, pass, "row moved during rescan, scanning again");
            }
        }

        let current = engine.current();
        let explained = events.iter().any(|e| e.kind == EventKind::Pressed);
        if edge.level == Level::High && !explained {
            tracing::debug!(row = edge.row, "activation without a new key, re-reporting held keys");
            events.extend(current.pressed().map(|(row, col)| Event {
                row,
                col,
                symbol: self.symbols.get(row, col).unwrap_or(Symbol::UNUSED),
                kind: EventKind::Pressed,
                timestamp: now,
            }));
        }

        debouncer.sync(current);
        drop(core);

        log_events(&events);
        events
    }

    /// Previous snapshot as seen by the edge tracker.
    pub fn previous(&self) -> KeyState {
        self.lock().tracker.previous().clone()
    }
}

fn log_events(events: &[Event]) {
    for e in events {
        tracing::debug!(row = e.row, col = e.col, symbol = %e.symbol, kind = ?e.kind, "key edge");
    }
}
