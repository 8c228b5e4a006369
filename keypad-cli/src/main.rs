mod console;
mod layout;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use keypad_engine::sim::{SimColumn, SimMatrix, SimRow};
use keypad_engine::{Debounce, InterruptTriggered, Keypad, KeypadConfig, PollingLoop, SymbolMap};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keypad-cli")]
#[command(about = "Matrix keypad scanner console (simulated 6x4 keypad)")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the keypad on a fixed period
    Poll {
        /// Milliseconds between scans
        #[arg(long, default_value_t = 20)]
        period_ms: u64,
        #[command(flatten)]
        debounce: DebounceArgs,
        /// How long `tap` holds a key, in milliseconds
        #[arg(long, default_value_t = 100)]
        tap_ms: u64,
    },
    /// Rescan the keypad whenever a row line changes level
    Interrupt {
        /// How long `tap` holds a key, in milliseconds
        #[arg(long, default_value_t = 100)]
        tap_ms: u64,
    },
    /// Print the keypad layout
    Layout,
}

#[derive(Args)]
#[group(multiple = false)]
struct DebounceArgs {
    /// Accept a change only after this many consecutive scans
    #[arg(long)]
    debounce_scans: Option<u32>,
    /// Accept a change only after it has held this many milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,
}

impl DebounceArgs {
    fn policy(&self) -> Debounce {
        match (self.debounce_scans, self.debounce_ms) {
            (Some(scans), _) => Debounce::Scans(scans),
            (None, Some(ms)) => Debounce::Elapsed(Duration::from_millis(ms)),
            (None, None) => Debounce::TrustHardware,
        }
    }
}

/// Logs go to stderr so the prompt and key reports on stdout stay readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("keypad_engine=info,keypad_cli=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_keypad(config: KeypadConfig) -> Result<(SimMatrix, Keypad<SimColumn, SimRow>)> {
    let symbols = SymbolMap::reference();
    let sim = SimMatrix::new(symbols.rows(), symbols.cols());
    let keypad = Keypad::new(sim.column_lines(), sim.row_lines(), symbols, config)
        .context("building keypad")?;
    Ok((sim, keypad))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Poll {
            period_ms,
            debounce,
            tap_ms,
        } => {
            let config = KeypadConfig::default()
                .with_poll_period(Duration::from_millis(period_ms))
                .with_debounce(debounce.policy());
            let (sim, keypad) = build_keypad(config)?;
            let symbols = keypad.symbols().clone();

            let poller =
                PollingLoop::spawn(keypad, console::printer()).context("starting polling loop")?;
            let result = console::run(&sim, &symbols, Duration::from_millis(tap_ms));
            poller.stop();
            result?;
        }
        Command::Interrupt { tap_ms } => {
            let (sim, keypad) = build_keypad(KeypadConfig::default())?;
            let symbols = keypad.symbols().clone();

            let handler = InterruptTriggered::attach(keypad, console::printer())
                .context("attaching edge handler")?;
            let result = console::run(&sim, &symbols, Duration::from_millis(tap_ms));
            handler.detach();
            result?;
        }
        Command::Layout => {
            print!("{}", layout::render(&SymbolMap::reference()));
        }
    }

    Ok(())
}
