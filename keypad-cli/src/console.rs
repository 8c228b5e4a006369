//! Interactive console for the simulated keypad.
//!
//! Reads one command per line from stdin and flips switches on the
//! simulated matrix; the running strategy notices and reports events.

use std::collections::BTreeMap;
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use keypad_engine::sim::SimMatrix;
use keypad_engine::{Event, EventKind, Symbol, SymbolMap};

const HELP: &str = "commands: press <key> | release <key> | tap <key> | q
  <key> is a label such as Enter or 7, or a position row,col";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Press(usize, usize),
    Release(usize, usize),
    Tap(usize, usize),
    Help,
    Quit,
}

/// Parse one console line.
pub fn parse(line: &str, symbols: &SymbolMap) -> Result<Action> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Action::Help);
    };
    let key = words.next();
    if words.next().is_some() {
        bail!("too many arguments");
    }

    match (verb, key) {
        ("q", None) => Ok(Action::Quit),
        ("help" | "?", None) => Ok(Action::Help),
        ("press" | "p", Some(key)) => parse_key(key, symbols).map(|(r, c)| Action::Press(r, c)),
        ("release" | "r", Some(key)) => parse_key(key, symbols).map(|(r, c)| Action::Release(r, c)),
        ("tap" | "t", Some(key)) => parse_key(key, symbols).map(|(r, c)| Action::Tap(r, c)),
        ("press" | "p" | "release" | "r" | "tap" | "t", None) => bail!("{verb} needs a key"),
        _ => bail!("unknown command {line:?}"),
    }
}

fn parse_key(key: &str, symbols: &SymbolMap) -> Result<(usize, usize)> {
    if let Some((row, col)) = key.split_once(',') {
        let row: usize = row.trim().parse().with_context(|| format!("bad row in {key:?}"))?;
        let col: usize = col.trim().parse().with_context(|| format!("bad column in {key:?}"))?;
        if symbols.get(row, col).is_none() {
            bail!(
                "{row},{col} is outside the {}x{} matrix",
                symbols.rows(),
                symbols.cols()
            );
        }
        return Ok((row, col));
    }
    symbols
        .position(key)
        .with_context(|| format!("no key labelled {key:?}"))
}

/// Read commands until `q` or end of input.
pub fn run(sim: &SimMatrix, symbols: &SymbolMap, tap: Duration) -> Result<()> {
    println!("Running keypad\n\nPress 'q' to quit\n");

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        match parse(line.trim(), symbols) {
            Ok(Action::Quit) => break,
            Ok(Action::Help) => println!("{HELP}"),
            Ok(Action::Press(row, col)) => sim.press(row, col),
            Ok(Action::Release(row, col)) => sim.release(row, col),
            Ok(Action::Tap(row, col)) => {
                sim.press(row, col);
                thread::sleep(tap);
                sim.release(row, col);
            }
            Err(e) => eprintln!("{e:#}"),
        }
    }
    Ok(())
}

/// Keys currently held according to the events seen so far.
#[derive(Default)]
pub struct HeldKeys {
    keys: BTreeMap<(usize, usize), Symbol>,
}

impl HeldKeys {
    /// Apply an event. Returns whether the held set changed.
    pub fn apply(&mut self, event: &Event) -> bool {
        let key = (event.row, event.col);
        match event.kind {
            EventKind::Pressed => self.keys.insert(key, event.symbol).is_none(),
            EventKind::Released => self.keys.remove(&key).is_some(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("detected: [");
        for symbol in self.keys.values() {
            out.push(' ');
            out.push_str(symbol.label());
        }
        out.push_str(" ]");
        out
    }
}

/// Event consumer that prints each edge and the held set when it changes.
pub fn printer() -> impl FnMut(Event) + Send + 'static {
    let mut held = HeldKeys::default();
    move |event: Event| {
        let verb = match event.kind {
            EventKind::Pressed => "pressed",
            EventKind::Released => "released",
        };
        println!("key: '{}' {verb}", event.symbol);
        if held.apply(&event) {
            println!("{}", held.render());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn event(row: usize, col: usize, kind: EventKind) -> Event {
        Event {
            row,
            col,
            symbol: SymbolMap::reference().get(row, col).unwrap(),
            kind,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn parses_labels_and_positions() {
        let symbols = SymbolMap::reference();
        assert_eq!(parse("press Enter", &symbols).unwrap(), Action::Press(4, 3));
        assert_eq!(parse("r 2,1", &symbols).unwrap(), Action::Release(2, 1));
        assert_eq!(parse("tap 0", &symbols).unwrap(), Action::Tap(5, 1));
        assert_eq!(parse("q", &symbols).unwrap(), Action::Quit);
        assert_eq!(parse("", &symbols).unwrap(), Action::Help);
    }

    #[test]
    fn rejects_bad_input() {
        let symbols = SymbolMap::reference();
        assert!(parse("press", &symbols).is_err());
        assert!(parse("press F13", &symbols).is_err());
        assert!(parse("press 6,0", &symbols).is_err());
        assert!(parse("press a,b", &symbols).is_err());
        assert!(parse("press 1 2", &symbols).is_err());
        assert!(parse("quit", &symbols).is_err());
        assert!(parse("q now", &symbols).is_err());
    }

    #[test]
    fn held_keys_follow_events() {
        let mut held = HeldKeys::default();
        assert!(held.apply(&event(2, 0, EventKind::Pressed)));
        assert!(held.apply(&event(2, 1, EventKind::Pressed)));
        assert_eq!(held.render(), "detected: [ 7 8 ]");

        // Re-reported press of a held key changes nothing
        assert!(!held.apply(&event(2, 0, EventKind::Pressed)));
        assert!(held.apply(&event(2, 0, EventKind::Released)));
        assert_eq!(held.render(), "detected: [ 8 ]");
        assert!(!held.apply(&event(4, 3, EventKind::Released)));
    }
}
