use std::io::{self, BufRead, Write};

use anyhow::Result;
use unistate::{log_sink, with_tracing, Store};

mod commands;
mod config;
mod counter;
mod logger;

use commands::{Command, HELP};
use config::AppConfig;
use counter::{CounterAction, CounterState};

fn main() -> Result<()> {
    let log_file = logger::init()?;
    log::info!("Starting unistate-counter, logging to {}", log_file.display());

    let config = AppConfig::load();
    let store = build_store(&config);

    let _state_sub = store.subscribe(|state: &CounterState| println!("state: {:?}", state));
    let count = store.project(|state: &CounterState| state.count);
    let _count_sub = count.subscribe(|count: &i64| println!("count: {}", count));

    println!("{}", HELP);
    let stdin = io::stdin();
    run(&store, stdin.lock(), io::stdout())?;

    log::info!("Exiting unistate-counter");
    Ok(())
}

/// Build the store, wrapping the reducer with tracing when configured
fn build_store(config: &AppConfig) -> Store<CounterState, CounterAction> {
    let initial = CounterState::default();
    let builder = if config.trace {
        log::debug!("Tracing enabled");
        Store::builder(
            initial,
            with_tracing(counter::reduce, CounterState::clone, log_sink()),
        )
    } else {
        Store::builder(initial, counter::reduce)
    };
    builder.value_equality().config(config.store.clone()).build()
}

/// Read commands line by line until EOF or `quit`
fn run<R: BufRead, W: Write>(
    store: &Store<CounterState, CounterAction>,
    input: R,
    mut output: W,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Send(action)) => {
                log::debug!("Sending {:?}", action);
                match store.try_send(action) {
                    Ok(report) => log::debug!("{:?}", report),
                    Err(e) => writeln!(output, "error: {}", e)?,
                }
            }
            Ok(Command::PrintState) => writeln!(output, "{:?}", store.state())?,
            Ok(Command::Quit) => break,
            Err(e) => writeln!(output, "error: {:#}", e)?,
        }
        output.flush()?;
    }
    Ok(())
}
