//! Interactive shell over a single open lot
//!
//! Lines use the same syntax as the CLI subcommands, e.g.
//! `register --reg KA01AB1234 --owner Asha --phone 98000 --category car --zone A --slot A1`.

use clap::Parser;
use park_core::ParkingLot;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::{self, Command};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// What the shell should do with one input line
#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Quit,
    Run(Command),
    Invalid(String),
}

fn parse_line(line: &str) -> Input {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => Input::Empty,
        ["quit"] | ["exit"] => Input::Quit,
        _ => match ShellLine::try_parse_from(words) {
            Ok(parsed) => Input::Run(parsed.command),
            Err(e) => Input::Invalid(e.to_string()),
        },
    }
}

pub async fn run(lot: &ParkingLot) -> Result<(), Box<dyn std::error::Error>> {
    println!("\nCommands: init, register, exit, pay, history, slots, vehicles,");
    println!("          bookings, receipt, audit, help, quit\n");

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match parse_line(&line) {
                    Input::Empty => {}
                    Input::Quit => break,
                    Input::Invalid(usage) => println!("{}", usage),
                    Input::Run(command) => match commands::execute(lot, &command) {
                        Ok(output) => println!("{}", output),
                        Err(e) => {
                            warn!("Shell: {} failed: {}", command.name(), e);
                            println!("Error: {}", e);
                        }
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shell: Interrupted");
                break;
            }
        }
    }

    Ok(())
}
