//! Row-edge triggered scanning.
//!
//! While attached, every column is held active so that pressing any key
//! raises its row line. Each row edge is queued and a single worker
//! drains the queue: it takes the keypad lock, walks all columns to find
//! which key on the row moved, diffs against the previous snapshot and
//! delivers the events after unlocking.
//!
//! Without per-switch diodes this has hazards that are reproduced, not
//! corrected:
//! - A second key on a row that is already active raises no edge, so it
//!   goes unreported. Releasing the first key while the second is held
//!   lowers nothing either.
//! - A quick press and release of another key while one is held can be
//!   gone by the time the rescan runs. The rising edge is then blamed on
//!   the held key, which is reported as pressed again.
//! - The rescan is not debounced and ghost keys are reported like any
//!   other.

use std::panic;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{select, Sender};

use crate::edge::Consumer;
use crate::error::StrategyError;
use crate::keypad::Keypad;
use crate::line::{InputLine, OutputLine, RowEdge};

pub struct InterruptTriggered<O, I> {
    keypad: Keypad<O, I>,
    stop: Sender<()>,
    worker: JoinHandle<()>,
}

impl<O, I> InterruptTriggered<O, I>
where
    O: OutputLine + Send + 'static,
    I: InputLine + Send + 'static,
{
    /// Arm the matrix and start handling row edges.
    ///
    /// Fails with [`StrategyError::Unsupported`] if any row line can't
    /// report level changes; check [`Keypad::supports_interrupts`] first if
    /// the keypad should survive that.
    pub fn attach<C: Consumer>(keypad: Keypad<O, I>, mut consumer: C) -> Result<Self, StrategyError> {
        let (edge_tx, edge_rx) = crossbeam_channel::unbounded::<RowEdge>();
        keypad.attach_edges(&edge_tx)?;
        drop(edge_tx);

        let (stop, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let guard = keypad.guard();

        let spawned = thread::Builder::new()
            .name("keypad-edges".into())
            .spawn(move || {
                tracing::info!("edge handler started");
                let mut handle = |edge: RowEdge| {
                    tracing::trace!(row = edge.row, level = ?edge.level, "row edge");
                    for event in guard.rescan(edge, Instant::now()) {
                        consumer.deliver(event);
                    }
                };

                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(edge_rx) -> edge => match edge {
                            Ok(edge) => handle(edge),
                            Err(_) => break,
                        },
                    }
                }
                // Edges raised before the stop request still get handled
                for edge in edge_rx.try_iter() {
                    handle(edge);
                }
                tracing::info!("edge handler stopped");
            });

        let worker = match spawned {
            Ok(worker) => worker,
            Err(source) => {
                keypad.detach_edges();
                return Err(StrategyError::Spawn {
                    name: "keypad-edges",
                    source,
                });
            }
        };

        Ok(Self {
            keypad,
            stop,
            worker,
        })
    }

    pub fn keypad(&self) -> &Keypad<O, I> {
        &self.keypad
    }

    /// Handle any queued edges, deregister from the rows and hand the
    /// keypad back. An edge handler already running is allowed to finish.
    pub fn detach(self) -> Keypad<O, I> {
        let _ = self.stop.send(());
        if let Err(payload) = self.worker.join() {
            panic::resume_unwind(payload);
        }
        self.keypad.detach_edges();
        self.keypad
    }
}
