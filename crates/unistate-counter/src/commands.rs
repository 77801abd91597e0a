//! Commands read from stdin

use std::str::FromStr;

use anyhow::{bail, Context};

use crate::counter::CounterAction;

/// One line of input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Send an action to the store
    Send(CounterAction),
    /// Print the current state
    PrintState,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            bail!("empty command");
        };

        let command = match name {
            "inc" => Command::Send(CounterAction::Increment),
            "dec" => Command::Send(CounterAction::Decrement),
            "twice" => Command::Send(CounterAction::IncrementTwice),
            "noop" => Command::Send(CounterAction::DoNothing),
            "reset" => Command::Send(CounterAction::Reset),
            "set" => {
                let value = words.next().context("usage: set <number>")?;
                let value = value
                    .parse()
                    .with_context(|| format!("not a number: {}", value))?;
                Command::Send(CounterAction::SetValue(value))
            }
            "state" => Command::PrintState,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command: {}", other),
        };

        if let Some(extra) = words.next() {
            bail!("unexpected argument: {}", extra);
        }
        Ok(command)
    }
}

/// Help text listing all commands
pub const HELP: &str = "commands: inc, dec, twice, set <n>, noop, reset, state, quit";
