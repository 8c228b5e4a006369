//! Single-wire abstractions for the matrix.
//!
//! Column lines are driven (outputs), row lines are sensed (inputs). A row
//! line may additionally report level changes, which is what the
//! interrupt-triggered strategy hangs off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::error::LineFault;

/// Logic level of a row line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(active: bool) -> Self {
        if active {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// A level change on one row line. Says nothing about which column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RowEdge {
    pub row: usize,
    pub level: Level,
}

/// One driven column line.
pub trait OutputLine {
    fn activate(&mut self) -> Result<(), LineFault>;
    fn deactivate(&mut self) -> Result<(), LineFault>;
}

/// One sensed row line.
pub trait InputLine {
    /// Read the line. `true` = active (some switch connects it to a driven
    /// column).
    fn is_active(&mut self) -> Result<bool, LineFault>;

    /// Whether this line can report level changes through [`InputLine::watch`].
    fn supports_watch(&self) -> bool {
        false
    }

    /// Start reporting level changes to `sink`. Replaces any earlier sink.
    fn watch(&mut self, sink: EdgeSink) {
        let _ = sink;
    }

    /// Stop reporting level changes.
    fn unwatch(&mut self) {}
}

impl<T: OutputLine + ?Sized> OutputLine for Box<T> {
    fn activate(&mut self) -> Result<(), LineFault> {
        (**self).activate()
    }

    fn deactivate(&mut self) -> Result<(), LineFault> {
        (**self).deactivate()
    }
}

impl<T: InputLine + ?Sized> InputLine for Box<T> {
    fn is_active(&mut self) -> Result<bool, LineFault> {
        (**self).is_active()
    }

    fn supports_watch(&self) -> bool {
        (**self).supports_watch()
    }

    fn watch(&mut self, sink: EdgeSink) {
        (**self).watch(sink)
    }

    fn unwatch(&mut self) {
        (**self).unwatch()
    }
}

/// Where a row line reports its level changes.
///
/// Edges raised while a scan is in progress are dropped: the scan toggles
/// columns itself and those transitions must not retrigger a rescan.
/// Real changes hidden this way are caught when the rescan reads the rows
/// back after re-arming.
#[derive(Clone, Debug)]
pub struct EdgeSink {
    row: usize,
    tx: Sender<RowEdge>,
    scanning: Arc<AtomicBool>,
}

impl EdgeSink {
    pub(crate) fn new(row: usize, tx: Sender<RowEdge>, scanning: Arc<AtomicBool>) -> Self {
        Self { row, tx, scanning }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Report that the row line now sits at `level`.
    pub fn notify(&self, level: Level) {
        if self.scanning.load(Ordering::Acquire) {
            tracing::trace!(row = self.row, ?level, "edge during scan ignored");
            return;
        }
        // Receiver gone means the strategy detached; nothing to do.
        let _ = self.tx.send(RowEdge {
            row: self.row,
            level,
        });
    }
}
