//! Per-key debounce logic.
//!
//! A raw reading that differs from the debounced state only replaces it once
//! the new level has been seen consistently for the configured window. A
//! reading that reverts before then resets the key and is never reported.
//!
//! Bounce measured on reference hardware: the membrane keypad switches in
//! about 50ns, a telephone-style keypad takes about 5us to settle, and
//! press-to-GPIO-output latency was around 400us. Both pads are usable with
//! no software debounce; unknown switches should get a window of a few
//! milliseconds.

use std::time::{Duration, Instant};

use crate::matrix::KeyState;

/// Debounce policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Debounce {
    /// Accept every raw transition. For switches debounced mechanically
    /// or by the board.
    #[default]
    TrustHardware,
    /// Require this many consecutive scans at the new level.
    Scans(u32),
    /// Require the new level to hold for this long.
    Elapsed(Duration),
}

impl Debounce {
    /// Conservative window for switches of unknown bounce behaviour.
    pub const SAFE_MARGIN: Debounce = Debounce::Elapsed(Duration::from_millis(5));

    fn is_trusting(self) -> bool {
        match self {
            Debounce::TrustHardware => true,
            Debounce::Scans(n) => n <= 1,
            Debounce::Elapsed(d) => d.is_zero(),
        }
    }
}

/// A raw level that differs from the debounced one and is waiting to be
/// confirmed.
#[derive(Copy, Clone, Debug)]
struct Pending {
    since: Instant,
    scans: u32,
}

pub struct Debouncer {
    policy: Debounce,
    /// Debounced key states.
    stable: KeyState,
    /// Per-key pending transitions, row-major.
    pending: Vec<Option<Pending>>,
}

impl Debouncer {
    pub fn new(policy: Debounce, rows: usize, cols: usize) -> Self {
        Self {
            policy,
            stable: KeyState::new(rows, cols),
            pending: vec![None; rows * cols],
        }
    }

    pub fn policy(&self) -> Debounce {
        self.policy
    }

    /// Update the debouncer with a new raw matrix scan taken at `now`.
    /// Returns the debounced state. A scan of another shape is ignored.
    pub fn update(&mut self, raw: &KeyState, now: Instant) -> &KeyState {
        if !self.stable.same_shape(raw) {
            tracing::warn!(rows = raw.rows(), cols = raw.cols(), "raw scan shape mismatch, ignoring");
            return &self.stable;
        }
        if self.policy.is_trusting() {
            self.stable.copy_from(raw);
            return &self.stable;
        }

        let cols = self.stable.cols();
        for row in 0..self.stable.rows() {
            for col in 0..cols {
                let pressed = raw.get(row, col);
                let slot = &mut self.pending[row * cols + col];

                if pressed == self.stable.get(row, col) {
                    // Raw matches debounced state; any bounce is discarded
                    *slot = None;
                    continue;
                }

                let pending = slot.get_or_insert(Pending {
                    since: now,
                    scans: 0,
                });
                pending.scans += 1;

                let confirmed = match self.policy {
                    Debounce::Scans(window) => pending.scans >= window,
                    Debounce::Elapsed(window) => now.duration_since(pending.since) >= window,
                    Debounce::TrustHardware => true,
                };
                if confirmed {
                    self.stable.set(row, col, pressed);
                    *slot = None;
                }
            }
        }

        &self.stable
    }

    /// Force the debounced state, dropping anything pending.
    pub fn sync(&mut self, state: &KeyState) {
        if !self.stable.same_shape(state) {
            tracing::warn!(rows = state.rows(), cols = state.cols(), "sync shape mismatch, ignoring");
            return;
        }
        self.stable.copy_from(state);
        self.pending.iter_mut().for_each(|p| *p = None);
    }

    pub fn state(&self) -> &KeyState {
        &self.stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(pressed: bool) -> KeyState {
        let mut state = KeyState::new(1, 1);
        state.set(0, 0, pressed);
        state
    }

    #[test]
    fn trust_hardware_passes_raw_through() {
        let mut d = Debouncer::new(Debounce::TrustHardware, 1, 1);
        let now = Instant::now();
        assert!(d.update(&single(true), now).get(0, 0));
        assert!(!d.update(&single(false), now).get(0, 0));
    }

    #[test]
    fn scan_window_confirms_on_nth_scan() {
        let mut d = Debouncer::new(Debounce::Scans(3), 1, 1);
        let now = Instant::now();
        assert!(!d.update(&single(true), now).get(0, 0));
        assert!(!d.update(&single(true), now).get(0, 0));
        assert!(d.update(&single(true), now).get(0, 0));
    }

    #[test]
    fn bounce_shorter_than_window_is_discarded() {
        let mut d = Debouncer::new(Debounce::Scans(3), 1, 1);
        let now = Instant::now();
        d.update(&single(true), now);
        d.update(&single(true), now);
        // Reverts after W-1 scans
        assert!(!d.update(&single(false), now).get(0, 0));
        // Counting starts over
        assert!(!d.update(&single(true), now).get(0, 0));
        assert!(!d.update(&single(true), now).get(0, 0));
        assert!(d.update(&single(true), now).get(0, 0));
    }

    #[test]
    fn elapsed_window_uses_first_sighting() {
        let window = Duration::from_millis(5);
        let mut d = Debouncer::new(Debounce::Elapsed(window), 1, 1);
        let t0 = Instant::now();
        assert!(!d.update(&single(true), t0).get(0, 0));
        assert!(!d.update(&single(true), t0 + Duration::from_millis(4)).get(0, 0));
        assert!(d.update(&single(true), t0 + window).get(0, 0));
    }

    #[test]
    fn elapsed_window_discards_early_revert() {
        let mut d = Debouncer::new(Debounce::Elapsed(Duration::from_millis(5)), 1, 1);
        let t0 = Instant::now();
        d.update(&single(true), t0);
        d.update(&single(false), t0 + Duration::from_millis(2));
        // Fresh sighting: the window restarts here
        let t1 = t0 + Duration::from_millis(6);
        assert!(!d.update(&single(true), t1).get(0, 0));
        assert!(d.update(&single(true), t1 + Duration::from_millis(5)).get(0, 0));
    }

    #[test]
    fn degenerate_windows_trust_hardware() {
        assert!(Debounce::Scans(0).is_trusting());
        assert!(Debounce::Scans(1).is_trusting());
        assert!(Debounce::Elapsed(Duration::ZERO).is_trusting());
        assert!(!Debounce::SAFE_MARGIN.is_trusting());
    }

    #[test]
    fn sync_overrides_pending() {
        let mut d = Debouncer::new(Debounce::Scans(2), 1, 1);
        let now = Instant::now();
        d.update(&single(true), now);
        d.sync(&single(false));
        // Pending count was dropped, so one more scan is not enough
        assert!(!d.update(&single(true), now).get(0, 0));
        assert!(d.update(&single(true), now).get(0, 0));
    }

    #[test]
    fn scan_of_another_shape_is_ignored() {
        for policy in [Debounce::TrustHardware, Debounce::Scans(2)] {
            let mut d = Debouncer::new(policy, 1, 1);
            let now = Instant::now();
            d.update(&single(true), now);
            d.update(&single(true), now);

            let mut wrong = KeyState::new(2, 3);
            wrong.set(1, 2, true);
            assert_eq!(d.update(&wrong, now), &single(true), "{policy:?}");
            d.sync(&wrong);
            assert_eq!(d.state(), &single(true), "{policy:?}");
        }
    }
}
