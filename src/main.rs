//! spixfer - Chunked SPI transfers from the command line
//!
//! Opens a programmer (the dummy register emulator or a Linux spidev node),
//! runs a single write, read or full-duplex transfer through the chunking
//! engine, and prints any received bytes as a hex dump.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{BusArgs, Cli, Commands};
use commands::Operation;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG still wins over the -v count
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.verbose)),
    )
    .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Default log filter for a `-v` count
fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Write { bus, data } => {
            let data = commands::parse_hex_bytes(&data)?;
            execute(
                &bus,
                Operation::Write {
                    reg: bus.reg,
                    data,
                },
            )
        }
        Commands::Read { bus, len } => execute(&bus, Operation::Read { reg: bus.reg, len }),
        Commands::Transfer { bus, len, data } => {
            let data = commands::parse_hex_bytes(&data)?;
            let len = len.unwrap_or(data.len());
            execute(
                &bus,
                Operation::Transfer {
                    reg: bus.reg,
                    data,
                    len,
                },
            )
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    }
}

fn execute(bus: &BusArgs, op: Operation) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("Running {:?} on {}", op, bus.programmer);
    commands::run_operation(&bus.programmer, bus.chunk, &op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_log_filter() {
        assert_eq!(log_filter(0), "info");
        assert_eq!(log_filter(1), "debug");
        assert_eq!(log_filter(2), "trace");
        assert_eq!(log_filter(9), "trace");
    }

    #[test]
    fn test_debug_filter_enables_debug_records() {
        let logger = env_logger::Builder::new()
            .parse_filters(log_filter(1))
            .build();
        assert_eq!(logger.filter(), log::LevelFilter::Debug);

        let logger = env_logger::Builder::new()
            .parse_filters(log_filter(0))
            .build();
        assert_eq!(logger.filter(), log::LevelFilter::Info);
    }
}
