//! Line adapters for `embedded-hal` digital pins.
//!
//! Wrap board pins as matrix lines:
//! ```ignore
//! let columns = vec![HalColumn::new(c0, Polarity::ActiveHigh), /* ... */];
//! let rows = vec![HalRow::new(r0, Polarity::ActiveHigh), /* ... */];
//! let keypad = Keypad::new(columns, rows, SymbolMap::reference(), KeypadConfig::default())?;
//! ```
//! Pins of different types can be mixed by boxing them as
//! `Box<dyn OutputLine + Send>` / `Box<dyn InputLine + Send>`.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::LineFault;
use crate::line::{InputLine, OutputLine};

/// Electrical level that means "active".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    /// Typical with pull-ups: driving low selects a column, a low row
    /// means a closed switch.
    ActiveLow,
}

fn fault<E: embedded_hal::digital::Error>(err: E) -> LineFault {
    LineFault::new(format!("{:?}", err.kind()))
}

/// Column line backed by an output pin.
pub struct HalColumn<P> {
    pin: P,
    polarity: Polarity,
}

impl<P: OutputPin> HalColumn<P> {
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> OutputLine for HalColumn<P> {
    fn activate(&mut self) -> Result<(), LineFault> {
        let result = match self.polarity {
            Polarity::ActiveHigh => self.pin.set_high(),
            Polarity::ActiveLow => self.pin.set_low(),
        };
        result.map_err(fault)
    }

    fn deactivate(&mut self) -> Result<(), LineFault> {
        let result = match self.polarity {
            Polarity::ActiveHigh => self.pin.set_low(),
            Polarity::ActiveLow => self.pin.set_high(),
        };
        result.map_err(fault)
    }
}

/// Row line backed by an input pin. Plain pins can't report edges.
pub struct HalRow<P> {
    pin: P,
    polarity: Polarity,
}

impl<P: InputPin> HalRow<P> {
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: InputPin> InputLine for HalRow<P> {
    fn is_active(&mut self) -> Result<bool, LineFault> {
        let high = self.pin.is_high().map_err(fault)?;
        Ok(high == (self.polarity == Polarity::ActiveHigh))
    }
}
