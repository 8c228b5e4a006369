//! Fixed-period scanning on a dedicated thread.

use std::panic;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{RecvTimeoutError, Sender};

use crate::edge::Consumer;
use crate::error::StrategyError;
use crate::keypad::Keypad;
use crate::line::{InputLine, OutputLine};

/// Wakes every `poll_period`, scans under the keypad lock, then delivers
/// the resulting events with the lock released.
///
/// The stop signal is checked once per cycle, while waiting out the rest
/// of the period, so [`PollingLoop::stop`] returns within one period.
pub struct PollingLoop<O, I> {
    stop: Sender<()>,
    worker: JoinHandle<Keypad<O, I>>,
}

impl<O, I> PollingLoop<O, I>
where
    O: OutputLine + Send + 'static,
    I: InputLine + Send + 'static,
{
    /// Take over `keypad` and start polling it.
    pub fn spawn<C: Consumer>(keypad: Keypad<O, I>, mut consumer: C) -> Result<Self, StrategyError> {
        let (stop, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let period = keypad.config().poll_period;

        let worker = thread::Builder::new()
            .name("keypad-poll".into())
            .spawn(move || {
                tracing::info!(?period, "polling started");
                let mut cycles: u64 = 0;
                loop {
                    let started = Instant::now();
                    for event in keypad.cycle(started) {
                        consumer.deliver(event);
                    }
                    cycles += 1;

                    let remaining = period.saturating_sub(started.elapsed());
                    match stop_rx.recv_timeout(remaining) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::info!(cycles, "polling stopped");
                keypad
            })
            .map_err(|source| StrategyError::Spawn {
                name: "keypad-poll",
                source,
            })?;

        Ok(Self { stop, worker })
    }

    /// Stop after the current cycle and hand the keypad back.
    pub fn stop(self) -> Keypad<O, I> {
        // Worker may already have exited on its own; join tells us
        let _ = self.stop.send(());
        match self.worker.join() {
            Ok(keypad) => keypad,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
